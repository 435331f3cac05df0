//! Structural records between the header and the executable section.
//!
//! Each record knows its byte size, feeds itself through the rolling
//! checksum, and writes itself little-endian. Field order here and offset
//! arithmetic in the layout pass must stay in lockstep: every offset the
//! layout assigns is reproduced verbatim at emit time.

use std::io::{self, Write};

use oatpack_format::{ChecksumAccumulator, MethodLayout};

/// Descriptor for one input container: its location string, its own
/// checksum, and the offset of its class table.
#[derive(Debug)]
pub struct InputDescriptor<'a> {
    location: &'a str,
    input_checksum: u32,
    pub classes_offset: u32,
}

impl<'a> InputDescriptor<'a> {
    pub fn new(location: &'a str, input_checksum: u32) -> Self {
        Self {
            location,
            input_checksum,
            classes_offset: 0,
        }
    }

    /// 4 bytes length + location bytes + 4 bytes checksum + 4 bytes offset.
    pub fn size_of(&self) -> usize {
        4 + self.location.len() + 4 + 4
    }

    pub fn update_checksum(&self, checksum: &mut ChecksumAccumulator) {
        checksum.update_u32(self.location.len() as u32);
        checksum.update(self.location.as_bytes());
        checksum.update_u32(self.input_checksum);
        checksum.update_u32(self.classes_offset);
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&(self.location.len() as u32).to_le_bytes())?;
        w.write_all(self.location.as_bytes())?;
        w.write_all(&self.input_checksum.to_le_bytes())?;
        w.write_all(&self.classes_offset.to_le_bytes())?;
        Ok(())
    }
}

/// Per-input array of class-def offsets pointing into the methods tables.
#[derive(Debug)]
pub struct ClassTable {
    pub methods_offsets: Vec<u32>,
}

impl ClassTable {
    pub fn new(class_def_count: usize) -> Self {
        Self {
            methods_offsets: vec![0; class_def_count],
        }
    }

    pub fn size_of(&self) -> usize {
        self.methods_offsets.len() * 4
    }

    pub fn update_checksum(&self, checksum: &mut ChecksumAccumulator) {
        checksum.update_u32s(&self.methods_offsets);
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for &offset in &self.methods_offsets {
            w.write_all(&offset.to_le_bytes())?;
        }
        Ok(())
    }
}

/// Per-class-def array of method layout records.
///
/// An empty class-def (no class data) still owns a table; it just has
/// length zero and contributes no bytes.
#[derive(Debug)]
pub struct MethodsTable {
    pub layouts: Vec<MethodLayout>,
}

impl MethodsTable {
    pub fn new(method_count: usize) -> Self {
        Self {
            layouts: vec![MethodLayout::default(); method_count],
        }
    }

    pub fn size_of(&self) -> usize {
        self.layouts.len() * MethodLayout::SIZE
    }

    pub fn update_checksum(&self, checksum: &mut ChecksumAccumulator) {
        for layout in &self.layouts {
            checksum.update_u32s(&layout.as_words());
        }
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for layout in &self.layouts {
            w.write_all(&layout.to_bytes())?;
        }
        Ok(())
    }
}
