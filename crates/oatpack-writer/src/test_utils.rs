//! Test doubles and a read-back parser for writer tests.
//!
//! `FakeInput` and `FakeCompiler` stand in for the collaborator traits;
//! `read_back` re-parses a written container using only the documented
//! on-disk format (counts come from the inputs, exactly as a real
//! container reader consumes the container next to its inputs).

use std::collections::HashMap;

use oatpack_format::{InstructionSet, MethodLayout, OatHeader};

use crate::compiler::{
    CompiledInvokeStub, CompiledMethod, CompilerBackend, MethodRef, RuntimePatcher,
};
use crate::input::{ClassData, ClassInput, MethodInfo};

/// One class-def worth of (direct, virtual) methods; `None` means the
/// class-def has no class data.
pub type FakeClassDef = Option<(Vec<MethodInfo>, Vec<MethodInfo>)>;

pub struct FakeInput {
    pub location: String,
    pub checksum: u32,
    pub class_defs: Vec<FakeClassDef>,
    pub shorties: HashMap<u32, String>,
}

impl FakeInput {
    pub fn new(location: &str, checksum: u32) -> Self {
        Self {
            location: location.to_string(),
            checksum,
            class_defs: Vec::new(),
            shorties: HashMap::new(),
        }
    }

    pub fn with_class(mut self, directs: Vec<MethodInfo>, virtuals: Vec<MethodInfo>) -> Self {
        self.class_defs.push(Some((directs, virtuals)));
        self
    }

    pub fn with_empty_class(mut self) -> Self {
        self.class_defs.push(None);
        self
    }

    pub fn with_shorty(mut self, method_idx: u32, shorty: &str) -> Self {
        self.shorties.insert(method_idx, shorty.to_string());
        self
    }
}

impl ClassInput for FakeInput {
    fn location(&self) -> &str {
        &self.location
    }

    fn checksum(&self) -> u32 {
        self.checksum
    }

    fn class_def_count(&self) -> usize {
        self.class_defs.len()
    }

    fn class_data(&self, class_def_index: usize) -> Option<ClassData<'_>> {
        self.class_defs[class_def_index]
            .as_ref()
            .map(|(directs, virtuals)| ClassData {
                direct_methods: directs,
                virtual_methods: virtuals,
            })
    }

    fn method_shorty(&self, method_idx: u32) -> &str {
        self.shorties
            .get(&method_idx)
            .map(String::as_str)
            .unwrap_or("V")
    }
}

pub fn direct(method_idx: u32, access_flags: u32) -> MethodInfo {
    MethodInfo {
        method_idx,
        access_flags,
    }
}

pub struct FakeCompiler {
    pub isa: InstructionSet,
    methods: HashMap<(usize, u32), CompiledMethod>,
    /// Methods resolving to another method's record, sharing its buffers.
    aliases: HashMap<(usize, u32), (usize, u32)>,
    stubs: HashMap<(bool, String), CompiledInvokeStub>,
}

impl FakeCompiler {
    pub fn new(isa: InstructionSet) -> Self {
        Self {
            isa,
            methods: HashMap::new(),
            aliases: HashMap::new(),
            stubs: HashMap::new(),
        }
    }

    pub fn add_method(&mut self, input: usize, method_idx: u32, compiled: CompiledMethod) {
        self.methods.insert((input, method_idx), compiled);
    }

    /// Make `method_idx` resolve to `target`'s record (identical buffers).
    pub fn alias_method(&mut self, input: usize, method_idx: u32, target: (usize, u32)) {
        self.aliases.insert((input, method_idx), target);
    }

    pub fn add_stub(&mut self, is_static: bool, shorty: &str, stub: CompiledInvokeStub) {
        self.stubs.insert((is_static, shorty.to_string()), stub);
    }
}

impl CompilerBackend for FakeCompiler {
    fn instruction_set(&self) -> InstructionSet {
        self.isa
    }

    fn compiled_method(&self, method: MethodRef) -> Option<&CompiledMethod> {
        let key = (method.input, method.method_idx);
        let key = self.aliases.get(&key).copied().unwrap_or(key);
        self.methods.get(&key)
    }

    fn invoke_stub(&self, is_static: bool, shorty: &str) -> Option<&CompiledInvokeStub> {
        self.stubs.get(&(is_static, shorty.to_string()))
    }
}

/// Compiled method with sane defaults: 8-byte alignment, no thumb delta,
/// empty side tables.
pub fn compiled(code: Vec<u8>) -> CompiledMethod {
    CompiledMethod {
        code,
        code_alignment: 8,
        code_delta: 0,
        frame_size_in_bytes: 64,
        core_spill_mask: 0x4020,
        fp_spill_mask: 0,
        mapping_table: Vec::new(),
        vmap_table: Vec::new(),
    }
}

#[derive(Default)]
pub struct RecordingPatcher {
    pub calls: Vec<(MethodRef, bool, MethodLayout)>,
}

impl RuntimePatcher for RecordingPatcher {
    fn set_method_layout(&mut self, method: MethodRef, is_direct: bool, layout: &MethodLayout) {
        self.calls.push((method, is_direct, *layout));
    }
}

fn read_u32_le(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Everything a reader can recover from a written container.
pub struct ReadBack {
    pub header: OatHeader,
    /// Per input: location, input checksum, classes offset.
    pub descriptors: Vec<(String, u32, u32)>,
    /// Per input: methods-table offsets, one per class-def.
    pub class_tables: Vec<Vec<u32>>,
    /// Per class-def (flat across inputs): method layout records.
    pub methods: Vec<Vec<MethodLayout>>,
}

/// Parse a written container using only the documented format. Class-def
/// and method counts come from the inputs, as they do for a real reader.
pub fn read_back(bytes: &[u8], inputs: &[&dyn ClassInput]) -> ReadBack {
    let header = OatHeader::from_bytes(bytes);
    assert!(header.validate_magic());
    assert!(header.validate_version());
    assert_eq!(header.input_count as usize, inputs.len());

    let mut pos = OatHeader::SIZE;
    let mut descriptors = Vec::new();
    for _ in 0..header.input_count {
        let len = read_u32_le(bytes, pos) as usize;
        pos += 4;
        let location = String::from_utf8(bytes[pos..pos + len].to_vec()).unwrap();
        pos += len;
        let checksum = read_u32_le(bytes, pos);
        pos += 4;
        let classes_offset = read_u32_le(bytes, pos);
        pos += 4;
        descriptors.push((location, checksum, classes_offset));
    }

    let mut class_tables = Vec::new();
    for (i, input) in inputs.iter().enumerate() {
        let base = descriptors[i].2 as usize;
        let table: Vec<u32> = (0..input.class_def_count())
            .map(|c| read_u32_le(bytes, base + c * 4))
            .collect();
        class_tables.push(table);
    }

    let mut methods = Vec::new();
    for (i, input) in inputs.iter().enumerate() {
        for class_def in 0..input.class_def_count() {
            let base = class_tables[i][class_def] as usize;
            let count = input.class_data(class_def).map_or(0, |d| d.method_count());
            let layouts: Vec<MethodLayout> = (0..count)
                .map(|k| MethodLayout::from_bytes(&bytes[base + k * MethodLayout::SIZE..]))
                .collect();
            methods.push(layouts);
        }
    }

    ReadBack {
        header,
        descriptors,
        class_tables,
        methods,
    }
}
