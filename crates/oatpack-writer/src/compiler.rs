//! Compiler back-end collaborators.

use oatpack_format::{InstructionSet, MethodLayout};

/// Identifies a method within one input container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub input: usize,
    pub method_idx: u32,
}

impl std::fmt::Display for MethodRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "method {} of input {}", self.method_idx, self.input)
    }
}

/// Compiled output for one method.
///
/// Owned by the compiler; the writer borrows every buffer in here until
/// the container is fully written.
#[derive(Clone, Debug, Default)]
pub struct CompiledMethod {
    pub code: Vec<u8>,
    /// Required alignment of the code in the executable section.
    pub code_alignment: u32,
    /// Delta folded into the stored code address (thumb bit on ARM).
    pub code_delta: u32,
    pub frame_size_in_bytes: u32,
    pub core_spill_mask: u32,
    pub fp_spill_mask: u32,
    /// Correlates native code offsets with source bytecode offsets.
    pub mapping_table: Vec<u32>,
    /// Maps virtual registers to physical register slots or stack slots.
    pub vmap_table: Vec<u16>,
}

/// Compiled trampoline selected by method signature and static-ness.
#[derive(Clone, Debug, Default)]
pub struct CompiledInvokeStub {
    pub code: Vec<u8>,
    pub code_alignment: u32,
}

/// Compiler back-end the writer pulls artifacts from.
///
/// Lookups must be stable for the writer's lifetime: the same query
/// returns the same buffers, and equal outputs share one underlying
/// buffer. The dedup index keys on buffer identity, so distinct buffers
/// with equal contents are laid out twice.
pub trait CompilerBackend {
    fn instruction_set(&self) -> InstructionSet;

    /// Compiled code for a method, or `None` for abstract methods.
    fn compiled_method(&self, method: MethodRef) -> Option<&CompiledMethod>;

    /// Invoke stub for a signature, or `None` when none is needed.
    fn invoke_stub(&self, is_static: bool, shorty: &str) -> Option<&CompiledInvokeStub>;
}

/// Runtime write-back sink for image builds.
///
/// Receives every method's final layout record during the layout pass.
/// Pure side effect; has no influence on layout or emission.
pub trait RuntimePatcher {
    fn set_method_layout(&mut self, method: MethodRef, is_direct: bool, layout: &MethodLayout);
}
