/* SPDX-FileCopyrightText: © 2025-2026 lyn contributors */
/* SPDX-License-Identifier: MIT */

use std::collections::HashMap;

use crate::address::Address;
use crate::elf::{ElfImage, Pending};
use crate::error::LynError;
use crate::layout::{self, LayoutSection};
use crate::options::LinkOptions;
use crate::relocation::R_ARM_ABS32;
use crate::symtab::{GlobalSymbol, SymScope};

/// `bx pc; nop; ldr ip,[pc,#0]; bx ip; .word target` — bridges a short-range
/// Thumb branch or a ROM hook site to an arbitrary 32-bit ARM target.
pub const VENEER_BYTES: [u8; 16] = [
    0x78, 0x47, 0xC0, 0x46, 0x00, 0xC0, 0x9F, 0xE5, 0x1C, 0xFF, 0x2F, 0xE1, 0x00, 0x00, 0x00, 0x00,
];

/// Appends a 16-byte veneer section to `elfs[elf_idx]`, wires its embedded
/// `.word` as a pending `R_ARM_ABS32` against `target_global_idx`, and
/// extends `layout` with the new section placed right after the current
/// float-ROM cursor.
///
/// Returns the new layout index so callers can redirect a call site at it.
pub fn append_veneer(
    elfs: &mut [ElfImage],
    layout: &mut Vec<LayoutSection>,
    elf_idx: usize,
    target_global_idx: usize,
    label_hint: &str,
) -> usize {
    let sec_idx = elfs[elf_idx].append_synthetic_section(
        format!("__lyn_veneer_{label_hint}"),
        &VENEER_BYTES,
    );
    let layout_idx = layout::append_veneer(layout, elf_idx, sec_idx, VENEER_BYTES.len() as u32);
    elfs[elf_idx].sections[sec_idx].layout_index = Some(layout_idx);
    elfs[elf_idx].sections[sec_idx].pending.push(Pending {
        offset: 12,
        rel_type: R_ARM_ABS32,
        global_sym: target_global_idx,
    });
    layout_idx
}

/// For every defined global symbol whose name also names a ROM function in
/// `reference_addresses`, appends a hook veneer at that absolute address.
///
/// The veneer is placed as a `FloatRom` section like any other (it carries
/// its own `ORG`/`PUSH`/`POP` framing at emission time, driven by the
/// caller recording its target hook address — see [`crate::emit`]).
pub fn insert_hooks(
    elfs: &mut [ElfImage],
    table: &[GlobalSymbol],
    layout: &mut Vec<LayoutSection>,
    reference_addresses: &HashMap<String, (u32, bool)>,
    options: LinkOptions,
) -> Result<Vec<(usize, Address)>, LynError> {
    let mut hook_sites = Vec::new();
    if !options.hook() {
        return Ok(hook_sites);
    }

    for (global_idx, entry) in table.iter().enumerate() {
        if !matches!(entry.scope, SymScope::Global) || entry.name.is_empty() {
            continue;
        }
        let Some(&(addr, is_func)) = reference_addresses.get(&entry.name) else {
            continue;
        };
        let hook_addr = Address::absolute(addr as i64);
        if !hook_addr.is_rom_absolute() {
            return Err(LynError::HookNotInRom(entry.name.clone()));
        }
        if !is_func {
            return Err(LynError::HookNotAFunction(entry.name.clone()));
        }

        let layout_idx = append_veneer(elfs, layout, entry.elf_idx, global_idx, &entry.name);
        hook_sites.push((layout_idx, hook_addr));
    }

    Ok(hook_sites)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn veneer_bytes_encode_bx_pc_ldr_bx() {
        assert_eq!(VENEER_BYTES[0..4], [0x78, 0x47, 0xC0, 0x46]);
        assert_eq!(VENEER_BYTES[12..16], [0, 0, 0, 0]);
    }
}
