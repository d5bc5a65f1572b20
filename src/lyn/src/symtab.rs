/* SPDX-FileCopyrightText: © 2025-2026 lyn contributors */
/* SPDX-License-Identifier: MIT */

use std::collections::HashMap;

use crate::address::Address;
use crate::elf::raw::{SHN_ABS, SHN_COMMON, SHN_UNDEF, STB_LOCAL, STB_WEAK};
use crate::elf::ElfImage;
use crate::error::LynError;
use crate::layout::LayoutSection;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum SymScope {
    Local,
    Global,
    Undefined,
}

/// One entry of the merged global symbol table.
#[derive(Debug, Clone)]
pub struct GlobalSymbol {
    pub elf_idx: usize,
    /// Index of the `SHT_SYMTAB` section this entry's current definition
    /// was read from, *not* the section the symbol is defined in.
    pub symtab_sec_idx: usize,
    pub sym_idx: usize,
    pub name: String,
    pub scope: SymScope,
    /// True when the current definition has weak binding; only meaningful
    /// while merging runs, kept afterwards purely for inspection.
    pub is_weak: bool,
    /// Filled in by [`resolve_addresses`]; `None` until then, and remains
    /// `None` for symbols with no address knowable at lyn time.
    pub address: Option<Address>,
}

/// Builds the merged global symbol table across every input ELF and, on
/// each [`ElfImage`], the per-symtab indirection vector mapping local
/// symbol indices to entries in the returned table.
///
/// Merge rules: a non-local defined symbol replaces an existing undefined
/// or weak entry; two non-weak definitions of the same name are a
/// [`LynError::MultiplyDefined`] error; weak-vs-weak conflicts are silently
/// resolved in favor of whichever was seen first (an intentional gap, see
/// SPEC_FULL.md's Design Notes).
pub fn build_symbol_table(elfs: &mut [ElfImage]) -> Result<Vec<GlobalSymbol>, LynError> {
    let mut table: Vec<GlobalSymbol> = Vec::new();
    let mut by_name: HashMap<String, usize> = HashMap::new();

    for elf_idx in 0..elfs.len() {
        let symtab_sections: Vec<usize> = elfs[elf_idx]
            .sections
            .iter()
            .filter(|s| s.sh_type == crate::elf::raw::SHT_SYMTAB)
            .map(|s| s.index)
            .collect();

        for sec_idx in symtab_sections {
            let count = elfs[elf_idx].entry_count(sec_idx);
            let strtab_idx = elfs[elf_idx].sections[sec_idx].link as usize;
            let mut indirection = vec![0usize; count];

            for sym_idx in 0..count {
                let (name_off, bind, shndx) = {
                    let sym = elfs[elf_idx].symbol(sec_idx, sym_idx);
                    (sym.name_off(), sym.bind(), sym.shndx())
                };
                let name = elfs[elf_idx]
                    .string_at(strtab_idx, name_off)
                    .unwrap_or_default();

                let global_idx = if name.is_empty() || bind == STB_LOCAL {
                    table.push(GlobalSymbol {
                        elf_idx,
                        symtab_sec_idx: sec_idx,
                        sym_idx,
                        name: name.clone(),
                        scope: SymScope::Local,
                        is_weak: bind == STB_WEAK,
                        address: None,
                    });
                    table.len() - 1
                } else {
                    let incoming_scope = if shndx == SHN_UNDEF {
                        SymScope::Undefined
                    } else {
                        SymScope::Global
                    };

                    match by_name.get(&name).copied() {
                        None => {
                            table.push(GlobalSymbol {
                                elf_idx,
                                symtab_sec_idx: sec_idx,
                                sym_idx,
                                name: name.clone(),
                                scope: incoming_scope,
                                is_weak: bind == STB_WEAK,
                                address: None,
                            });
                            let idx = table.len() - 1;
                            by_name.insert(name, idx);
                            idx
                        }
                        Some(existing_idx) => {
                            merge_into(
                                &mut table[existing_idx],
                                elf_idx,
                                sec_idx,
                                sym_idx,
                                bind,
                                &name,
                                incoming_scope,
                            )?;
                            existing_idx
                        }
                    }
                };

                indirection[sym_idx] = global_idx;
            }

            elfs[elf_idx].sym_indirection[sec_idx] = Some(indirection);
        }
    }

    Ok(table)
}

fn merge_into(
    existing: &mut GlobalSymbol,
    elf_idx: usize,
    sec_idx: usize,
    sym_idx: usize,
    incoming_bind: u8,
    name: &str,
    incoming_scope: SymScope,
) -> Result<(), LynError> {
    if matches!(incoming_scope, SymScope::Undefined) {
        // Incoming is undefined: always keep whatever is already there.
        return Ok(());
    }

    // Incoming is defined.
    let existing_is_undefined = matches!(existing.scope, SymScope::Undefined);
    let existing_is_weak_definition = !existing_is_undefined && existing.is_weak;

    if existing_is_undefined || existing_is_weak_definition {
        existing.elf_idx = elf_idx;
        existing.symtab_sec_idx = sec_idx;
        existing.sym_idx = sym_idx;
        existing.scope = SymScope::Global;
        existing.is_weak = incoming_bind == STB_WEAK;
        return Ok(());
    }

    if incoming_bind == STB_WEAK {
        // Existing is a non-weak definition; keep it.
        return Ok(());
    }

    Err(LynError::MultiplyDefined(name.to_string()))
}

/// Fills in every global symbol's `address` from the ELF symbol it now
/// points at, using the layout to place section-relative symbols.
///
/// An entry left undefined by every patch ELF still gets an address here
/// when its name matches one contributed by the implicit reference ELF
/// (`reference_addresses`, built by [`crate::elf::ElfImage::build_reference_addresses`])
/// — this is what lets a patch call a vanilla ROM function by name without
/// redefining it.
pub fn resolve_addresses(
    table: &mut [GlobalSymbol],
    elfs: &[ElfImage],
    layout: &[LayoutSection],
    reference_addresses: &HashMap<String, (u32, bool)>,
) -> Result<(), LynError> {
    for entry in table.iter_mut() {
        let sym = elfs[entry.elf_idx].symbol(entry.symtab_sec_idx, entry.sym_idx);
        let shndx = sym.shndx();

        entry.address = if shndx == SHN_UNDEF || shndx == SHN_COMMON {
            reference_addresses
                .get(&entry.name)
                .map(|&(addr, _)| Address::absolute(addr as i64))
        } else if shndx == SHN_ABS {
            Some(Address::absolute(sym.value() as i64))
        } else {
            let owning_sec_idx = shndx as usize;
            match elfs[entry.elf_idx]
                .sections
                .get(owning_sec_idx)
                .and_then(|s| s.layout_index)
            {
                Some(layout_idx) => Some(layout[layout_idx].address.offset(sym.value() as i64)),
                None => None,
            }
        };
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sym(scope: SymScope, is_weak: bool) -> GlobalSymbol {
        GlobalSymbol {
            elf_idx: 0,
            symtab_sec_idx: 0,
            sym_idx: 0,
            name: "Proc_OnFrame".to_string(),
            scope,
            is_weak,
            address: None,
        }
    }

    #[test]
    fn undefined_incoming_never_overwrites() {
        let mut existing = sym(SymScope::Global, false);
        merge_into(&mut existing, 1, 0, 5, STB_WEAK, "Proc_OnFrame", SymScope::Undefined).unwrap();
        assert_eq!(existing.elf_idx, 0);
    }

    #[test]
    fn weak_existing_is_replaced_by_strong() {
        let mut existing = sym(SymScope::Global, true);
        merge_into(&mut existing, 1, 0, 5, STB_GLOBAL_BIND, "Proc_OnFrame", SymScope::Global)
            .unwrap();
        assert_eq!(existing.elf_idx, 1);
        assert_eq!(existing.is_weak, false);
    }

    #[test]
    fn two_strong_definitions_conflict() {
        let mut existing = sym(SymScope::Global, false);
        let err = merge_into(&mut existing, 1, 0, 5, STB_GLOBAL_BIND, "Proc_OnFrame", SymScope::Global)
            .unwrap_err();
        assert_eq!(err, LynError::MultiplyDefined("Proc_OnFrame".to_string()));
    }

    const STB_GLOBAL_BIND: u8 = 1;
}
