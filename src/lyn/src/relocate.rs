/* SPDX-FileCopyrightText: © 2025-2026 lyn contributors */
/* SPDX-License-Identifier: MIT */

use crate::address::{Address, Anchor};
use crate::elf::raw::{SHN_ABS, SHN_COMMON, SHN_UNDEF, SHT_REL, SHT_RELA};
use crate::elf::{ElfImage, Pending};
use crate::error::LynError;
use crate::hooks;
use crate::layout::LayoutSection;
use crate::options::LinkOptions;
use crate::relocation::{self, R_ARM_THM_CALL, R_ARM_V4BX};
use crate::symtab::GlobalSymbol;

/// Walks every REL/RELA section of every input ELF, concretely patching
/// section bytes where the target is known and local to the same anchor,
/// and otherwise recording a [`Pending`] relocation for the emitter.
///
/// An out-of-range `R_ARM_THM_CALL` with `-longcalls` enabled is never left
/// as a deferred textual relocation (a `BL`-class field cannot be rendered
/// as an expression): instead a veneer is synthesized in the owning ELF,
/// appended to `layout`, and the call site is concretized against it.
pub fn apply_relocations(
    elfs: &mut [ElfImage],
    table: &[GlobalSymbol],
    layout: &mut Vec<LayoutSection>,
    options: LinkOptions,
) -> Result<(), LynError> {
    for elf_idx in 0..elfs.len() {
        let rel_sections: Vec<(usize, u32, usize, usize)> = elfs[elf_idx]
            .sections
            .iter()
            .filter(|s| s.sh_type == SHT_REL || s.sh_type == SHT_RELA)
            .map(|s| (s.index, s.sh_type, s.link as usize, s.info as usize))
            .collect();

        for (rel_sec_idx, sh_type, symtab_idx, target_sec_idx) in rel_sections {
            let target_layout_idx = elfs[elf_idx].sections[target_sec_idx].layout_index;
            let Some(target_layout_idx) = target_layout_idx else {
                continue;
            };

            let entry_count = elfs[elf_idx].entry_count(rel_sec_idx);
            let entsize = elfs[elf_idx].sections[rel_sec_idx].entsize as usize;
            let rel_data_off = elfs[elf_idx].sections[rel_sec_idx].data_offset as usize;

            for i in 0..entry_count {
                let target_sec_anchor = layout[target_layout_idx].address.anchor();
                let target_sec_base = layout[target_layout_idx].address;

                let entry_bytes_start = rel_data_off + i * entsize;
                let raw_entry = {
                    let bytes = elfs[elf_idx].raw_bytes();
                    let end = entry_bytes_start + entsize;
                    if sh_type == SHT_RELA {
                        crate::elf::raw::RelEntry::read_rela(&bytes[entry_bytes_start..end])
                    } else {
                        crate::elf::raw::RelEntry::read_rel(&bytes[entry_bytes_start..end])
                    }
                };

                if raw_entry.rel_type == R_ARM_V4BX {
                    continue;
                }

                let global_idx = elfs[elf_idx].sym_indirection[symtab_idx]
                    .as_ref()
                    .expect("symtab indirection built before relocation application")
                    [raw_entry.sym_index as usize];

                let reloc_info = relocation::lookup(raw_entry.rel_type)?;

                let field_offset = raw_entry.r_offset as usize;
                let field_addend = {
                    let data = elfs[elf_idx].section_data_mut(target_sec_idx);
                    reloc_info.extract(&data[field_offset..field_offset + reloc_info.byte_len()])
                };
                let addend = raw_entry.r_addend as i64 + field_addend;

                let ref_sym = elfs[elf_idx].symbol(symtab_idx, raw_entry.sym_index as usize);
                let ref_shndx = ref_sym.shndx();

                if ref_shndx == SHN_COMMON {
                    let name = elfs[elf_idx]
                        .string_at(
                            elfs[elf_idx].sections[symtab_idx].link as usize,
                            ref_sym.name_off(),
                        )
                        .unwrap_or_default();
                    return Err(LynError::RelocationToCommon(name));
                }

                let target_addr: Option<Address> = if ref_shndx == SHN_ABS {
                    Some(Address::absolute(ref_sym.value() as i64))
                } else if ref_shndx == SHN_UNDEF {
                    // Unresolved within this ELF's own symbol table: falls
                    // back to whatever the merged global table resolved the
                    // name to, including an address contributed by the
                    // implicit reference ELF.
                    table.get(global_idx).and_then(|s| s.address)
                } else {
                    match elfs[elf_idx]
                        .sections
                        .get(ref_shndx as usize)
                        .and_then(|s| s.layout_index)
                    {
                        Some(idx) => Some(layout[idx].address.offset(ref_sym.value() as i64)),
                        None => return Err(LynError::RelocationToDiscarded),
                    }
                };

                let mut concretized = false;
                let mut needs_veneer = false;

                if options.link() {
                    if let Some(target) = target_addr {
                        if !reloc_info.is_relative() && target.anchor() == Anchor::Absolute {
                            let value = target.raw_offset() + addend;
                            let data = elfs[elf_idx].section_data_mut(target_sec_idx);
                            reloc_info.inject(
                                &mut data[field_offset..field_offset + reloc_info.byte_len()],
                                value,
                            );
                            concretized = true;
                        } else if reloc_info.is_relative() && target.anchor() == target_sec_anchor
                        {
                            let pc = target_sec_base.raw_offset() + raw_entry.r_offset as i64;
                            let value = target.raw_offset() + addend - pc;

                            // Only `R_ARM_THM_CALL` ever fails to fit: a
                            // `BL`-class field can't be rendered as a
                            // textual expression, so an out-of-range call
                            // needs a veneer (or is fatal) instead of the
                            // unconditional inject every other kind gets.
                            if raw_entry.rel_type == R_ARM_THM_CALL && !reloc_info.can_encode(value)
                            {
                                if options.longcalls() {
                                    needs_veneer = true;
                                } else {
                                    let name = global_symbol_name(table, global_idx);
                                    return Err(LynError::CallOutOfRange(name));
                                }
                            } else {
                                let data = elfs[elf_idx].section_data_mut(target_sec_idx);
                                reloc_info.inject(
                                    &mut data[field_offset..field_offset + reloc_info.byte_len()],
                                    value,
                                );
                                concretized = true;
                            }
                        }
                    }
                }

                if needs_veneer {
                    let label = global_symbol_name(table, global_idx);
                    let veneer_layout_idx =
                        hooks::append_veneer(elfs, layout, elf_idx, global_idx, &label);
                    let veneer_addr = layout[veneer_layout_idx].address;
                    let pc = target_sec_base.raw_offset() + raw_entry.r_offset as i64;
                    let value = veneer_addr.raw_offset() - pc;
                    let data = elfs[elf_idx].section_data_mut(target_sec_idx);
                    reloc_info.inject(
                        &mut data[field_offset..field_offset + reloc_info.byte_len()],
                        value,
                    );
                    concretized = true;
                }

                if !concretized {
                    let data = elfs[elf_idx].section_data_mut(target_sec_idx);
                    reloc_info.inject(
                        &mut data[field_offset..field_offset + reloc_info.byte_len()],
                        addend,
                    );
                    elfs[elf_idx].sections[target_sec_idx].pending.push(Pending {
                        offset: raw_entry.r_offset,
                        rel_type: raw_entry.rel_type,
                        global_sym: global_idx,
                    });
                }
            }
        }

        for sec in elfs[elf_idx].sections.iter_mut() {
            sec.pending.sort_by_key(|p| p.offset);
        }
    }

    Ok(())
}

fn global_symbol_name(table: &[GlobalSymbol], idx: usize) -> String {
    table
        .get(idx)
        .map(|s| s.name.clone())
        .unwrap_or_default()
}
