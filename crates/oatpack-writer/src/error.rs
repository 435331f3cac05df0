//! Writer failure taxonomy.
//!
//! Nothing is recovered locally: the first error aborts all remaining
//! writes and a partial file may be left behind for the caller to delete.

use std::io;

use crate::compiler::MethodRef;

/// Logical record being processed when a failure occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Record {
    Header,
    InputDescriptor { input: usize },
    ClassTable { input: usize },
    MethodsTable { class_index: usize },
    PagePadding,
    MethodCode(MethodRef),
    FrameWords(MethodRef),
    MappingTable(MethodRef),
    VmapTable(MethodRef),
    InvokeStub(MethodRef),
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Header => write!(f, "header"),
            Self::InputDescriptor { input } => write!(f, "descriptor for input {input}"),
            Self::ClassTable { input } => write!(f, "class table for input {input}"),
            Self::MethodsTable { class_index } => {
                write!(f, "methods table for class {class_index}")
            }
            Self::PagePadding => write!(f, "executable section padding"),
            Self::MethodCode(m) => write!(f, "code for {m}"),
            Self::FrameWords(m) => write!(f, "frame words for {m}"),
            Self::MappingTable(m) => write!(f, "mapping table for {m}"),
            Self::VmapTable(m) => write!(f, "vmap table for {m}"),
            Self::InvokeStub(m) => write!(f, "invoke stub for {m}"),
        }
    }
}

/// Error writing a container.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// The underlying file write or seek failed.
    #[error("failed to write {record}: {source}")]
    Write {
        record: Record,
        #[source]
        source: io::Error,
    },

    /// An emitted offset disagreed with the one computed during layout.
    /// Fatal: the dual-pass contract was violated by an internal bug, not
    /// by bad input.
    #[error("{record}: emit offset {actual} does not match layout offset {expected}")]
    LayoutMismatch {
        record: Record,
        expected: u32,
        actual: u64,
    },

    /// An alignment seek landed off the expected boundary. Same category
    /// as [`WriteError::LayoutMismatch`].
    #[error("alignment seek landed at {actual}, expected {expected}")]
    AlignmentMismatch { expected: u32, actual: u64 },

    /// Page size or code alignment is unusable.
    #[error("{what} {value} is not a nonzero power of two")]
    InvalidAlignment { what: &'static str, value: u32 },

    /// A virtual method carried the static access flag.
    #[error("virtual {0} is marked static")]
    StaticVirtualMethod(MethodRef),
}
