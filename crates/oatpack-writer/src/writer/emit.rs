//! Emit pass: stream the laid-out container and prove the offsets.
//!
//! Walks inputs, class-defs, and methods in exactly the layout pass's
//! order, re-deriving the byte cursor by the same arithmetic. Alignment
//! gaps inside the executable section are forward seeks, never writes; the
//! page gap before the section is materialized as zeros so the file always
//! reaches the executable offset. Every non-deduplicated write is
//! bracketed by a position check against the layout's offset; any
//! disagreement is a fatal internal error.

use std::io::{Seek, SeekFrom, Write};

use oatpack_format::align_up;

use crate::compiler::MethodRef;
use crate::dedup::{BufferId, DedupKind};
use crate::error::{Record, WriteError};

use super::OatWriter;

impl OatWriter<'_> {
    /// Stream the container to `file`, reproducing every layout offset.
    ///
    /// The file cursor must be at the start of an empty file.
    pub fn write_to<W: Write + Seek>(&self, file: &mut W) -> Result<(), WriteError> {
        file.write_all(&self.header.to_bytes())
            .map_err(|source| WriteError::Write {
                record: Record::Header,
                source,
            })?;

        self.write_tables(file)?;
        let offset = self.write_executable_padding(file)?;
        self.write_code(file, offset)?;
        Ok(())
    }

    fn write_tables<W: Write>(&self, file: &mut W) -> Result<(), WriteError> {
        for (input, descriptor) in self.descriptors.iter().enumerate() {
            descriptor
                .write_to(file)
                .map_err(|source| WriteError::Write {
                    record: Record::InputDescriptor { input },
                    source,
                })?;
        }
        for (input, table) in self.class_tables.iter().enumerate() {
            table.write_to(file).map_err(|source| WriteError::Write {
                record: Record::ClassTable { input },
                source,
            })?;
        }
        for (class_index, table) in self.methods_tables.iter().enumerate() {
            table.write_to(file).map_err(|source| WriteError::Write {
                record: Record::MethodsTable { class_index },
                source,
            })?;
        }
        Ok(())
    }

    /// Pad the tables out to the page boundary with zeros and verify the
    /// position matches the recorded executable offset.
    fn write_executable_padding<W: Write + Seek>(&self, file: &mut W) -> Result<u32, WriteError> {
        let as_write_err = |source| WriteError::Write {
            record: Record::PagePadding,
            source,
        };

        let padding = vec![0u8; self.executable_offset_padding as usize];
        file.write_all(&padding).map_err(as_write_err)?;

        let position = file.stream_position().map_err(as_write_err)?;
        if position != u64::from(self.header.executable_offset) {
            return Err(WriteError::AlignmentMismatch {
                expected: self.header.executable_offset,
                actual: position,
            });
        }
        Ok(self.header.executable_offset)
    }

    fn write_code<W: Write + Seek>(&self, file: &mut W, mut offset: u32) -> Result<(), WriteError> {
        let mut class_index = 0;
        for input_index in 0..self.inputs.len() {
            for class_def in 0..self.inputs[input_index].class_def_count() {
                offset =
                    self.write_code_class_def(file, offset, input_index, class_def, class_index)?;
                class_index += 1;
            }
        }
        Ok(())
    }

    fn write_code_class_def<W: Write + Seek>(
        &self,
        file: &mut W,
        mut offset: u32,
        input_index: usize,
        class_def: usize,
        class_index: usize,
    ) -> Result<u32, WriteError> {
        let Some(class_data) = self.inputs[input_index].class_data(class_def) else {
            return Ok(offset);
        };

        let mut table_index = 0;
        for info in class_data.direct_methods {
            let method = MethodRef {
                input: input_index,
                method_idx: info.method_idx,
            };
            offset = self.write_code_method(
                file,
                offset,
                class_index,
                table_index,
                method,
                info.is_static(),
            )?;
            table_index += 1;
        }
        for info in class_data.virtual_methods {
            let method = MethodRef {
                input: input_index,
                method_idx: info.method_idx,
            };
            offset = self.write_code_method(file, offset, class_index, table_index, method, false)?;
            table_index += 1;
        }
        Ok(offset)
    }

    /// Emit one method's artifacts with the layout pass's dedup discipline.
    ///
    /// An artifact whose position-derived offset equals the layout record's
    /// field is a first occurrence: its bytes are written here. Anything
    /// else is a dedup hit (or an empty artifact) whose bytes already live
    /// at the first-assigned offset; the file does not move.
    fn write_code_method<W: Write + Seek>(
        &self,
        file: &mut W,
        mut offset: u32,
        class_index: usize,
        table_index: usize,
        method: MethodRef,
        is_static: bool,
    ) -> Result<u32, WriteError> {
        let layout = self.methods_tables[class_index].layouts[table_index];
        let compiled = self.compiler.compiled_method(method);

        if let Some(compiled) = compiled {
            let record = Record::MethodCode(method);
            offset = self.seek_alignment(file, offset, compiled.code_alignment, record)?;

            let code_size = compiled.code.len() as u32;
            let position_offset = offset + compiled.code_delta;
            let first = self
                .dedup
                .lookup(DedupKind::Code, BufferId::of_bytes(&compiled.code));
            match first {
                Some(first_offset) if position_offset != layout.code_offset => {
                    verify_dedup_hit(code_size, layout.code_offset, first_offset, record)?;
                }
                _ => {
                    verify_first_write(code_size, layout.code_offset, position_offset, record)?;
                    file.write_all(&compiled.code)
                        .map_err(|source| WriteError::Write { record, source })?;
                    offset += code_size;
                    self.check_position(file, offset, record)?;
                }
            }
        }

        // Frame words are written for every method and never deduplicated;
        // abstract methods get zeros. The layout record is the source of
        // truth for both passes.
        let record = Record::FrameWords(method);
        for word in [
            layout.frame_size_in_bytes,
            layout.core_spill_mask,
            layout.fp_spill_mask,
        ] {
            file.write_all(&word.to_le_bytes())
                .map_err(|source| WriteError::Write { record, source })?;
            offset += 4;
        }
        self.check_position(file, offset, record)?;

        if let Some(compiled) = compiled {
            let record = Record::MappingTable(method);
            let size = (compiled.mapping_table.len() * 4) as u32;
            let first = self.dedup.lookup(
                DedupKind::MappingTable,
                BufferId::of_u32s(&compiled.mapping_table),
            );
            match first {
                Some(first_offset) if offset != layout.mapping_table_offset => {
                    verify_dedup_hit(size, layout.mapping_table_offset, first_offset, record)?;
                }
                _ => {
                    verify_first_write(size, layout.mapping_table_offset, offset, record)?;
                    let bytes: Vec<u8> = compiled
                        .mapping_table
                        .iter()
                        .flat_map(|v| v.to_le_bytes())
                        .collect();
                    file.write_all(&bytes)
                        .map_err(|source| WriteError::Write { record, source })?;
                    offset += size;
                    self.check_position(file, offset, record)?;
                }
            }

            let record = Record::VmapTable(method);
            let size = (compiled.vmap_table.len() * 2) as u32;
            let first = self
                .dedup
                .lookup(DedupKind::VmapTable, BufferId::of_u16s(&compiled.vmap_table));
            match first {
                Some(first_offset) if offset != layout.vmap_table_offset => {
                    verify_dedup_hit(size, layout.vmap_table_offset, first_offset, record)?;
                }
                _ => {
                    verify_first_write(size, layout.vmap_table_offset, offset, record)?;
                    let bytes: Vec<u8> = compiled
                        .vmap_table
                        .iter()
                        .flat_map(|v| v.to_le_bytes())
                        .collect();
                    file.write_all(&bytes)
                        .map_err(|source| WriteError::Write { record, source })?;
                    offset += size;
                    self.check_position(file, offset, record)?;
                }
            }
        }

        let shorty = self.inputs[method.input].method_shorty(method.method_idx);
        if let Some(stub) = self.compiler.invoke_stub(is_static, shorty) {
            let record = Record::InvokeStub(method);
            offset = self.seek_alignment(file, offset, stub.code_alignment, record)?;

            let size = stub.code.len() as u32;
            let first = self
                .dedup
                .lookup(DedupKind::Code, BufferId::of_bytes(&stub.code));
            match first {
                Some(first_offset) if offset != layout.invoke_stub_offset => {
                    verify_dedup_hit(size, layout.invoke_stub_offset, first_offset, record)?;
                }
                _ => {
                    verify_first_write(size, layout.invoke_stub_offset, offset, record)?;
                    file.write_all(&stub.code)
                        .map_err(|source| WriteError::Write { record, source })?;
                    offset += size;
                    self.check_position(file, offset, record)?;
                }
            }
        }
        Ok(offset)
    }

    /// Seek forward over an alignment gap and verify the landing position.
    fn seek_alignment<W: Write + Seek>(
        &self,
        file: &mut W,
        offset: u32,
        alignment: u32,
        record: Record,
    ) -> Result<u32, WriteError> {
        let aligned = align_up(offset, alignment);
        let delta = aligned - offset;
        if delta != 0 {
            let position = file
                .seek(SeekFrom::Current(i64::from(delta)))
                .map_err(|source| WriteError::Write { record, source })?;
            if position != u64::from(aligned) {
                return Err(WriteError::AlignmentMismatch {
                    expected: aligned,
                    actual: position,
                });
            }
        }
        Ok(aligned)
    }

    /// File position is authoritative: it must equal the re-derived cursor
    /// after every non-deduplicated write.
    fn check_position<W: Write + Seek>(
        &self,
        file: &mut W,
        expected: u32,
        record: Record,
    ) -> Result<(), WriteError> {
        let actual = file
            .stream_position()
            .map_err(|source| WriteError::Write { record, source })?;
        if actual != u64::from(expected) {
            return Err(WriteError::LayoutMismatch {
                record,
                expected,
                actual,
            });
        }
        Ok(())
    }
}

/// A dedup hit must leave the layout field pointing at the first copy, or
/// at 0 for an empty artifact.
fn verify_dedup_hit(
    size: u32,
    stored: u32,
    first_offset: u32,
    record: Record,
) -> Result<(), WriteError> {
    if (size == 0 && stored == 0) || first_offset == stored {
        Ok(())
    } else {
        Err(WriteError::LayoutMismatch {
            record,
            expected: stored,
            actual: u64::from(first_offset),
        })
    }
}

/// A first occurrence must land exactly on the offset layout recorded.
fn verify_first_write(
    size: u32,
    stored: u32,
    position_offset: u32,
    record: Record,
) -> Result<(), WriteError> {
    if (size == 0 && stored == 0) || position_offset == stored {
        Ok(())
    } else {
        Err(WriteError::LayoutMismatch {
            record,
            expected: stored,
            actual: u64::from(position_offset),
        })
    }
}
