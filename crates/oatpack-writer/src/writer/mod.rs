//! The two-pass container writer.
//!
//! The layout pass runs inside [`OatWriter::new`]: it sizes every
//! structural record, assigns an offset to every method's code, mapping
//! table, vmap table, and invoke stub (deduplicating as it goes), and
//! folds all logical contents into the rolling checksum. The emit pass
//! ([`OatWriter::write_to`]) then streams the bytes and verifies at every
//! non-deduplicated write that the file position reproduces the layout's
//! offset exactly.

mod emit;
mod layout;


use std::io::{Seek, Write};

use oatpack_format::{ChecksumAccumulator, OatHeader};
use tracing::error;

use crate::compiler::{CompilerBackend, RuntimePatcher};
use crate::dedup::DedupIndex;
use crate::error::WriteError;
use crate::input::ClassInput;
use crate::records::{ClassTable, InputDescriptor, MethodsTable};

/// Serialize `inputs` into a single container on `file`.
///
/// The file cursor must be at the start of an empty file. `file_name` is
/// only a label for diagnostics. Supplying a `patcher` puts the writer in
/// image mode: every method's final layout record is handed back for
/// runtime write-back.
///
/// On error the file contents are unspecified; the caller is responsible
/// for deleting the partial output.
pub fn write_oat<'a, W: Write + Seek>(
    file: &mut W,
    file_name: &str,
    inputs: &'a [&'a dyn ClassInput],
    compiler: &'a dyn CompilerBackend,
    patcher: Option<&'a mut dyn RuntimePatcher>,
) -> Result<(), WriteError> {
    let result = match OatWriter::new(inputs, compiler, patcher) {
        Ok(writer) => writer.write_to(file),
        Err(err) => Err(err),
    };
    result.inspect_err(|err| {
        error!(file = file_name, %err, "container write failed");
    })
}

/// Writer state shared by the two passes.
///
/// All structural tables are owned; every code and side-table buffer is
/// borrowed from the compiler and the inputs for `'a`. Collaborators must
/// stay quiescent until the writer is dropped.
pub struct OatWriter<'a> {
    inputs: &'a [&'a dyn ClassInput],
    compiler: &'a dyn CompilerBackend,
    patcher: Option<&'a mut dyn RuntimePatcher>,
    header: OatHeader,
    checksum: ChecksumAccumulator,
    descriptors: Vec<InputDescriptor<'a>>,
    class_tables: Vec<ClassTable>,
    /// One table per class-def, flat across inputs in walk order.
    methods_tables: Vec<MethodsTable>,
    dedup: DedupIndex,
    page_size: u32,
    executable_offset_padding: u32,
}

impl OatWriter<'_> {
    /// Final header as computed by the layout pass.
    pub fn header(&self) -> &OatHeader {
        &self.header
    }
}
