//! Two-pass writer for oatpack AOT containers.
//!
//! Serializes compiled classes from a set of input class-containers into a
//! single executable-bearing container: structural tables up front, a
//! page-aligned executable section behind them, content-deduplicated code
//! and side tables, and a rolling checksum over the logical contents.
//!
//! The writer does not parse inputs or compile methods; those are
//! collaborator concerns behind [`ClassInput`] and [`CompilerBackend`].
//! This crate owns the hard part: the layout pass assigns a byte offset to
//! every record and artifact, and the emit pass must reproduce each of
//! those offsets exactly at the file position where the bytes land.

pub mod compiler;
pub mod dedup;
pub mod error;
pub mod input;
pub mod records;
pub mod writer;

#[cfg(test)]
pub mod test_utils;

#[cfg(test)]
mod records_tests;

pub use compiler::{
    CompiledInvokeStub, CompiledMethod, CompilerBackend, MethodRef, RuntimePatcher,
};
pub use error::{Record, WriteError};
pub use input::{ACC_STATIC, ClassData, ClassInput, MethodInfo};
pub use writer::{OatWriter, write_oat};
