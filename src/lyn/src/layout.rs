/* SPDX-FileCopyrightText: © 2025-2026 lyn contributors */
/* SPDX-License-Identifier: MIT */

use crate::address::{Address, Anchor};
use crate::elf::ElfImage;
use crate::error::LynError;

/// One retained section's place in the emitted output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutSection {
    pub address: Address,
    pub elf_idx: usize,
    pub sec_idx: usize,
    pub size: u32,
}

fn align_up(value: i64, align: i64) -> i64 {
    (value + align - 1) / align * align
}

/// Walks every input ELF in order and every section in header order,
/// retaining allocated, non-writable, nonzero-size sections as `FloatRom`
/// layout entries, then assigns each a 4-byte-aligned offset.
///
/// Sets each retained section's `layout_index` back-pointer as it goes.
pub fn build_layout(elfs: &mut [ElfImage]) -> Result<Vec<LayoutSection>, LynError> {
    let mut layout = Vec::new();

    for elf_idx in 0..elfs.len() {
        let section_count = elfs[elf_idx].sections.len();
        for sec_idx in 0..section_count {
            let (retained, writable, name, size) = {
                let sec = &elfs[elf_idx].sections[sec_idx];
                (
                    sec.is_retained(),
                    sec.is_writable(),
                    sec.name.clone(),
                    sec.data_size,
                )
            };
            if !retained {
                continue;
            }
            if writable {
                return Err(LynError::WritableSectionLayout(name));
            }

            let layout_index = layout.len();
            layout.push(LayoutSection {
                address: Address::float_rom(0),
                elf_idx,
                sec_idx,
                size,
            });
            elfs[elf_idx].sections[sec_idx].layout_index = Some(layout_index);
        }
    }

    finalize_layout(&mut layout);
    Ok(layout)
}

/// Assigns running 4-byte-aligned offsets to every `FloatRom` entry, in
/// place, in the order they were appended.
fn finalize_layout(layout: &mut [LayoutSection]) {
    let mut cursor: i64 = 0;
    for entry in layout.iter_mut() {
        if entry.address.anchor() == Anchor::FloatRom {
            cursor = align_up(cursor, 4);
            entry.address = Address::float_rom(cursor);
            cursor += entry.size as i64;
        }
    }
}

/// Appends a synthetic section (a hook or long-call veneer) to the owning
/// ELF's retained layout, after the initial layout has already been built.
/// Callers must re-run [`finalize_layout`]-equivalent bookkeeping
/// (`extend_layout` does this for the caller).
pub fn append_veneer(
    layout: &mut Vec<LayoutSection>,
    elf_idx: usize,
    sec_idx: usize,
    size: u32,
) -> usize {
    let layout_index = layout.len();
    let mut cursor = layout
        .last()
        .map(|l| {
            if l.address.anchor() == Anchor::FloatRom {
                l.address.raw_offset() + l.size as i64
            } else {
                0
            }
        })
        .unwrap_or(0);
    cursor = align_up(cursor, 4);
    layout.push(LayoutSection {
        address: Address::float_rom(cursor),
        elf_idx,
        sec_idx,
        size,
    });
    layout_index
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn aligns_successive_float_rom_sections() {
        let mut layout = vec![
            LayoutSection {
                address: Address::float_rom(0),
                elf_idx: 0,
                sec_idx: 0,
                size: 5,
            },
            LayoutSection {
                address: Address::float_rom(0),
                elf_idx: 0,
                sec_idx: 1,
                size: 8,
            },
        ];
        finalize_layout(&mut layout);
        assert_eq!(layout[0].address.raw_offset(), 0);
        assert_eq!(layout[1].address.raw_offset(), 8);
    }
}
