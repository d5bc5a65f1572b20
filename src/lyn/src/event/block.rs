/* SPDX-FileCopyrightText: © 2025-2026 lyn contributors */
/* SPDX-License-Identifier: MIT */

use std::collections::HashMap;

use super::code::EventCode;

/// A section's worth of output: a byte array plus a sparse map from byte
/// offset to a directive that replaces the raw bytes at that offset.
///
/// Stretches of the byte array with no mapped code are emitted as packed
/// `BYTE`/`SHORT`/`WORD` runs (see [`crate::emit`]); mapped stretches are
/// emitted as their code's directive instead.
pub struct EventBlock {
    size: usize,
    /// Per-byte: which pool entry (if any) starts-or-continues at this
    /// offset. `None` means "raw, unmapped byte".
    code_map: Vec<Option<usize>>,
    pool: Vec<MappedCode>,
}

struct MappedCode {
    code: EventCode,
    offset: usize,
    len: usize,
}

impl EventBlock {
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            size,
            code_map: vec![None; size],
            pool: Vec::new(),
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Maps `code` over `[offset, offset+len)`, replacing whatever those
    /// bytes' raw/mapped status was before.
    pub fn map_code(&mut self, offset: usize, len: usize, code: EventCode) {
        let idx = self.pool.len();
        self.pool.push(MappedCode { code, offset, len });
        for slot in &mut self.code_map[offset..offset + len] {
            *slot = Some(idx);
        }
    }

    #[must_use]
    pub fn code_at(&self, offset: usize) -> Option<&EventCode> {
        self.code_map[offset].map(|idx| &self.pool[idx].code)
    }

    /// Extent (in bytes) of the mapped code starting at `offset`, if any
    /// code starts exactly there.
    #[must_use]
    pub fn mapped_run_at(&self, offset: usize) -> Option<usize> {
        let idx = self.code_map[offset]?;
        let entry = &self.pool[idx];
        if entry.offset == offset {
            Some(entry.len)
        } else {
            None
        }
    }

    /// Merges adjacent mapped codes of the same kind into one, rewriting
    /// the merged range's map entries to point at the surviving entry.
    pub fn pack(&mut self) {
        let mut offset = 0;
        while offset < self.size {
            let Some(idx) = self.code_map[offset] else {
                offset += 1;
                continue;
            };
            if self.pool[idx].offset != offset {
                offset += 1;
                continue;
            }
            let mut end = offset + self.pool[idx].len;
            loop {
                if end >= self.size {
                    break;
                }
                let Some(next_idx) = self.code_map[end] else {
                    break;
                };
                if self.pool[next_idx].offset != end {
                    break;
                }
                if !self.pool[idx].code.can_combine_with(&self.pool[next_idx].code) {
                    break;
                }
                let next_len = self.pool[next_idx].len;
                let next_code = std::mem::replace(
                    &mut self.pool[next_idx].code,
                    EventCode::new(self.pool[next_idx].code.kind, Vec::new(), false),
                );
                self.pool[idx].code.combine(next_code);
                self.pool[idx].len += next_len;
                for slot in &mut self.code_map[end..end + next_len] {
                    *slot = Some(idx);
                }
                end += next_len;
            }
            offset = end;
        }
    }

    /// Rebuilds the code pool by walking `code_map` in order, dropping any
    /// entries `pack()` left orphaned.
    pub fn optimize(&mut self) {
        let mut new_pool = Vec::new();
        let mut remap: HashMap<usize, usize> = HashMap::new();
        let mut offset = 0;
        while offset < self.size {
            if let Some(idx) = self.code_map[offset] {
                let new_idx = *remap.entry(idx).or_insert_with(|| {
                    let entry = std::mem::replace(
                        &mut self.pool[idx],
                        MappedCode {
                            code: EventCode::new(self.pool[idx].code.kind, Vec::new(), false),
                            offset: 0,
                            len: 0,
                        },
                    );
                    new_pool.push(entry);
                    new_pool.len() - 1
                });
                let run_len = new_pool[new_idx].len;
                for slot in &mut self.code_map[offset..offset + run_len] {
                    *slot = Some(new_idx);
                }
                offset += run_len;
            } else {
                offset += 1;
            }
        }
        self.pool = new_pool;
    }
}

#[cfg(test)]
mod tests {
    use super::super::code::EventCodeKind;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn pack_merges_adjacent_words() {
        let mut block = EventBlock::new(8);
        block.map_code(0, 4, EventCode::new(EventCodeKind::Word, vec!["1".into()], false));
        block.map_code(4, 4, EventCode::new(EventCodeKind::Word, vec!["2".into()], false));
        block.pack();
        block.optimize();
        assert_eq!(block.mapped_run_at(0), Some(8));
        assert_eq!(block.code_at(0).unwrap().args, vec!["1", "2"]);
    }

    #[test]
    fn currentoffset_anchored_code_blocks_merge() {
        let mut block = EventBlock::new(8);
        block.map_code(0, 4, EventCode::new(EventCodeKind::Word, vec!["1".into()], false));
        block.map_code(
            4,
            4,
            EventCode::new(EventCodeKind::Word, vec!["CURRENTOFFSET".into()], true),
        );
        block.pack();
        assert_eq!(block.mapped_run_at(0), Some(4));
        assert_eq!(block.mapped_run_at(4), Some(4));
    }

    #[test]
    fn unmapped_bytes_stay_unmapped() {
        let mut block = EventBlock::new(4);
        block.map_code(1, 2, EventCode::new(EventCodeKind::Short, vec!["1".into()], false));
        assert!(block.code_at(0).is_none());
        assert!(block.code_at(3).is_none());
        assert_eq!(block.mapped_run_at(1), Some(2));
    }
}
