//! Per-method layout record (7 x u32).

/// Offsets into the executable section plus frame metadata for one method.
///
/// A zero offset means "absent": no code, no table, no stub. A nonzero
/// `code_offset` may carry a thumb bit on ARM; the underlying file
/// position is always instruction-aligned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MethodLayout {
    pub code_offset: u32,
    pub frame_size_in_bytes: u32,
    pub core_spill_mask: u32,
    pub fp_spill_mask: u32,
    pub mapping_table_offset: u32,
    pub vmap_table_offset: u32,
    pub invoke_stub_offset: u32,
}

impl MethodLayout {
    pub const SIZE: usize = 28;

    /// The record's fields in on-disk order.
    pub fn as_words(&self) -> [u32; 7] {
        [
            self.code_offset,
            self.frame_size_in_bytes,
            self.core_spill_mask,
            self.fp_spill_mask,
            self.mapping_table_offset,
            self.vmap_table_offset,
            self.invoke_stub_offset,
        ]
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        for (i, word) in self.as_words().into_iter().enumerate() {
            bytes[i * 4..i * 4 + 4].copy_from_slice(&word.to_le_bytes());
        }
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        assert!(bytes.len() >= Self::SIZE, "method layout record too short");

        let word = |i: usize| {
            u32::from_le_bytes([bytes[i * 4], bytes[i * 4 + 1], bytes[i * 4 + 2], bytes[i * 4 + 3]])
        };
        Self {
            code_offset: word(0),
            frame_size_in_bytes: word(1),
            core_spill_mask: word(2),
            fp_spill_mask: word(3),
            mapping_table_offset: word(4),
            vmap_table_offset: word(5),
            invoke_stub_offset: word(6),
        }
    }
}

const _: () = assert!(MethodLayout::SIZE == 7 * 4);
