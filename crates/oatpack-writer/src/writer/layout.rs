//! Layout pass: size everything, assign every offset, checksum everything.
//!
//! Proceeds in strict order: header, input descriptors, class tables,
//! methods tables, page alignment of the executable section, then one
//! layout step per method. Every step threads the byte cursor forward and
//! returns the new value; the emit pass re-derives the same cursor and
//! must land on the same offsets.

use oatpack_format::{
    ChecksumAccumulator, MethodLayout, OatHeader, PAGE_SIZE, align_up, is_valid_alignment,
};
use tracing::debug;

use crate::compiler::{CompilerBackend, MethodRef, RuntimePatcher};
use crate::dedup::{BufferId, DedupIndex, DedupKind};
use crate::error::WriteError;
use crate::input::ClassInput;
use crate::records::{ClassTable, InputDescriptor, MethodsTable};

use super::OatWriter;

impl<'a> OatWriter<'a> {
    /// Run the layout pass over `inputs`.
    ///
    /// Fails loudly on unusable alignment constants and on corrupt method
    /// listings; the returned writer is otherwise fully laid out and ready
    /// to emit.
    pub fn new(
        inputs: &'a [&'a dyn ClassInput],
        compiler: &'a dyn CompilerBackend,
        patcher: Option<&'a mut dyn RuntimePatcher>,
    ) -> Result<Self, WriteError> {
        let isa = compiler.instruction_set();
        validate_alignment("page size", PAGE_SIZE)?;
        validate_alignment("instruction alignment", isa.code_alignment())?;

        let header = OatHeader::new(isa, inputs.len() as u32);
        let mut checksum = ChecksumAccumulator::new();
        header.seed_checksum(&mut checksum);

        let mut writer = Self {
            inputs,
            compiler,
            patcher,
            header,
            checksum,
            descriptors: Vec::with_capacity(inputs.len()),
            class_tables: Vec::with_capacity(inputs.len()),
            methods_tables: Vec::new(),
            dedup: DedupIndex::new(),
            page_size: PAGE_SIZE,
            executable_offset_padding: 0,
        };

        let mut offset = OatHeader::SIZE as u32;
        offset = writer.init_descriptors(offset);
        offset = writer.init_class_tables(offset);
        offset = writer.init_methods_tables(offset);
        offset = writer.init_executable_section(offset);
        let end = writer.init_code(offset)?;
        writer.header.checksum = writer.checksum.value();

        debug!(
            inputs = inputs.len(),
            classes = writer.methods_tables.len(),
            executable_offset = writer.header.executable_offset,
            code_bytes = end - writer.header.executable_offset,
            dedup_hits = writer.dedup.hits(),
            "layout complete"
        );
        Ok(writer)
    }

    /// Append one descriptor per input. Their `classes_offset` fields are
    /// filled in (and checksummed) once the class tables are placed.
    fn init_descriptors(&mut self, mut offset: u32) -> u32 {
        for &input in self.inputs {
            let descriptor = InputDescriptor::new(input.location(), input.checksum());
            offset += descriptor.size_of() as u32;
            self.descriptors.push(descriptor);
        }
        offset
    }

    fn init_class_tables(&mut self, mut offset: u32) -> u32 {
        for (i, input) in self.inputs.iter().enumerate() {
            self.descriptors[i].classes_offset = offset;
            self.descriptors[i].update_checksum(&mut self.checksum);

            let table = ClassTable::new(input.class_def_count());
            offset += table.size_of() as u32;
            self.class_tables.push(table);
        }
        offset
    }

    fn init_methods_tables(&mut self, mut offset: u32) -> u32 {
        for (i, input) in self.inputs.iter().enumerate() {
            for class_def in 0..input.class_def_count() {
                self.class_tables[i].methods_offsets[class_def] = offset;

                let method_count = input
                    .class_data(class_def)
                    .map_or(0, |data| data.method_count());
                let table = MethodsTable::new(method_count);
                offset += table.size_of() as u32;
                self.methods_tables.push(table);
            }
            self.class_tables[i].update_checksum(&mut self.checksum);
        }
        offset
    }

    /// Round the cursor up to the next page and pin the executable offset.
    fn init_executable_section(&mut self, offset: u32) -> u32 {
        let aligned = align_up(offset, self.page_size);
        self.executable_offset_padding = aligned - offset;
        self.header.executable_offset = aligned;
        aligned
    }

    fn init_code(&mut self, mut offset: u32) -> Result<u32, WriteError> {
        let mut class_index = 0;
        for input_index in 0..self.inputs.len() {
            for class_def in 0..self.inputs[input_index].class_def_count() {
                offset = self.init_code_class_def(offset, input_index, class_def, class_index)?;
                self.methods_tables[class_index].update_checksum(&mut self.checksum);
                class_index += 1;
            }
        }
        Ok(offset)
    }

    /// Lay out every method of one class-def: directs first in member-index
    /// order, then virtuals.
    fn init_code_class_def(
        &mut self,
        mut offset: u32,
        input_index: usize,
        class_def: usize,
        class_index: usize,
    ) -> Result<u32, WriteError> {
        let Some(class_data) = self.inputs[input_index].class_data(class_def) else {
            // Empty class-def: zero-length methods table, no code.
            return Ok(offset);
        };

        let mut table_index = 0;
        for info in class_data.direct_methods {
            let method = MethodRef {
                input: input_index,
                method_idx: info.method_idx,
            };
            offset = self.init_code_method(
                offset,
                class_index,
                table_index,
                method,
                info.is_static(),
                true,
            )?;
            table_index += 1;
        }
        for info in class_data.virtual_methods {
            let method = MethodRef {
                input: input_index,
                method_idx: info.method_idx,
            };
            if info.is_static() {
                return Err(WriteError::StaticVirtualMethod(method));
            }
            offset = self.init_code_method(offset, class_index, table_index, method, false, false)?;
            table_index += 1;
        }
        Ok(offset)
    }

    /// Assign offsets for one method's code, frame words, side tables, and
    /// invoke stub, deduplicating against earlier identical buffers.
    fn init_code_method(
        &mut self,
        mut offset: u32,
        class_index: usize,
        table_index: usize,
        method: MethodRef,
        is_static: bool,
        is_direct: bool,
    ) -> Result<u32, WriteError> {
        let mut layout = MethodLayout::default();
        let compiled = self.compiler.compiled_method(method);

        if let Some(compiled) = compiled {
            validate_alignment("code alignment", compiled.code_alignment)?;
            offset = align_up(offset, compiled.code_alignment);

            let code_size = compiled.code.len() as u32;
            let provisional = if code_size == 0 {
                0
            } else {
                offset + compiled.code_delta
            };
            let (code_offset, inserted) = self.dedup.lookup_or_insert(
                DedupKind::Code,
                BufferId::of_bytes(&compiled.code),
                provisional,
            );
            if inserted {
                offset += code_size;
                self.checksum.update(&compiled.code);
            }

            layout.code_offset = code_offset;
            layout.frame_size_in_bytes = compiled.frame_size_in_bytes;
            layout.core_spill_mask = compiled.core_spill_mask;
            layout.fp_spill_mask = compiled.fp_spill_mask;
        }

        // The three frame words ride inline in the executable section for
        // every method, compiled or not, and are never deduplicated.
        // Abstract methods contribute zeros.
        for word in [
            layout.frame_size_in_bytes,
            layout.core_spill_mask,
            layout.fp_spill_mask,
        ] {
            offset += 4;
            self.checksum.update_u32(word);
        }

        if let Some(compiled) = compiled {
            let provisional = if compiled.mapping_table.is_empty() {
                0
            } else {
                offset
            };
            let (mapping_offset, inserted) = self.dedup.lookup_or_insert(
                DedupKind::MappingTable,
                BufferId::of_u32s(&compiled.mapping_table),
                provisional,
            );
            if inserted {
                offset += (compiled.mapping_table.len() * 4) as u32;
                self.checksum.update_u32s(&compiled.mapping_table);
            }
            layout.mapping_table_offset = mapping_offset;

            let provisional = if compiled.vmap_table.is_empty() {
                0
            } else {
                offset
            };
            let (vmap_offset, inserted) = self.dedup.lookup_or_insert(
                DedupKind::VmapTable,
                BufferId::of_u16s(&compiled.vmap_table),
                provisional,
            );
            if inserted {
                offset += (compiled.vmap_table.len() * 2) as u32;
                self.checksum.update_u16s(&compiled.vmap_table);
            }
            layout.vmap_table_offset = vmap_offset;
        }

        // The stub step runs whether or not the method was compiled.
        let shorty = self.inputs[method.input].method_shorty(method.method_idx);
        if let Some(stub) = self.compiler.invoke_stub(is_static, shorty) {
            validate_alignment("stub alignment", stub.code_alignment)?;
            offset = align_up(offset, stub.code_alignment);

            let provisional = if stub.code.is_empty() { 0 } else { offset };
            let (stub_offset, inserted) = self.dedup.lookup_or_insert(
                DedupKind::Code,
                BufferId::of_bytes(&stub.code),
                provisional,
            );
            if inserted {
                offset += stub.code.len() as u32;
                self.checksum.update(&stub.code);
            }
            layout.invoke_stub_offset = stub_offset;
        }

        self.methods_tables[class_index].layouts[table_index] = layout;

        if let Some(patcher) = self.patcher.as_mut() {
            patcher.set_method_layout(method, is_direct, &layout);
        }
        Ok(offset)
    }
}

fn validate_alignment(what: &'static str, value: u32) -> Result<(), WriteError> {
    if is_valid_alignment(value) {
        Ok(())
    } else {
        Err(WriteError::InvalidAlignment { what, value })
    }
}
