//! Content-addressed offset maps for code and side tables.
//!
//! Keys are the identity of compiler-owned buffers: the compiler hands out
//! one buffer per distinct output, so address identity collapses equal
//! outputs onto one offset and one physical byte range. Method code and
//! invoke stubs share a single map (code-vs-stub dedup is wanted); mapping
//! tables and vmap tables each get their own.

use std::collections::HashMap;

/// Identity of a borrowed buffer: address plus element count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferId {
    addr: usize,
    len: usize,
}

impl BufferId {
    pub fn of_bytes(buf: &[u8]) -> Self {
        Self {
            addr: buf.as_ptr() as usize,
            len: buf.len(),
        }
    }

    pub fn of_u32s(buf: &[u32]) -> Self {
        Self {
            addr: buf.as_ptr() as usize,
            len: buf.len(),
        }
    }

    pub fn of_u16s(buf: &[u16]) -> Self {
        Self {
            addr: buf.as_ptr() as usize,
            len: buf.len(),
        }
    }
}

/// Which map a lookup targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DedupKind {
    /// Method code and invoke stubs.
    Code,
    MappingTable,
    VmapTable,
}

/// First-assigned offsets for deduplicated artifacts.
///
/// Grows monotonically; populated by the layout pass, consulted read-only
/// by the emit pass.
#[derive(Debug, Default)]
pub struct DedupIndex {
    code: HashMap<BufferId, u32>,
    mapping: HashMap<BufferId, u32>,
    vmap: HashMap<BufferId, u32>,
    hits: u32,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the offset assigned to `key`, inserting `provisional` on
    /// first sight.
    ///
    /// The flag is true when `provisional` was inserted: the caller then
    /// advances the layout cursor by the buffer's size and checksums the
    /// buffer's contents. On a hit neither happens.
    pub fn lookup_or_insert(
        &mut self,
        kind: DedupKind,
        key: BufferId,
        provisional: u32,
    ) -> (u32, bool) {
        let map = match kind {
            DedupKind::Code => &mut self.code,
            DedupKind::MappingTable => &mut self.mapping,
            DedupKind::VmapTable => &mut self.vmap,
        };
        if let Some(&offset) = map.get(&key) {
            self.hits += 1;
            (offset, false)
        } else {
            map.insert(key, provisional);
            (provisional, true)
        }
    }

    /// Offset previously assigned to `key`, if any.
    pub fn lookup(&self, kind: DedupKind, key: BufferId) -> Option<u32> {
        let map = match kind {
            DedupKind::Code => &self.code,
            DedupKind::MappingTable => &self.mapping,
            DedupKind::VmapTable => &self.vmap,
        };
        map.get(&key).copied()
    }

    /// Dedup hits observed so far.
    pub fn hits(&self) -> u32 {
        self.hits
    }
}
