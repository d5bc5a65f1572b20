/* SPDX-FileCopyrightText: © 2025-2026 lyn contributors */
/* SPDX-License-Identifier: MIT */

use crate::elf::ElfImage;
use crate::emit;
use crate::error::LynError;
use crate::hooks;
use crate::layout;
use crate::options::LinkOptions;
use crate::relocate;
use crate::symtab;

/// One input ELF32 image: a display name (used only in error messages) and
/// its owned bytes.
#[derive(Debug, Clone)]
pub struct NamedElf {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl NamedElf {
    #[must_use]
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Converts a set of relocatable ARM32 ELF32 objects into an Event
/// Assembler script.
///
/// The first input (by input order, independent of position) whose shape
/// matches [`ElfImage::is_implicit_reference`] is treated as the reference
/// address table rather than a patch: its sections are never laid out and
/// its symbols never enter the merged symbol table, so a patch is free to
/// define a global with the same name as a reference function — that
/// collision is exactly what hook insertion (`-hook`) resolves.
pub fn link(inputs: &[NamedElf], options: LinkOptions) -> Result<String, LynError> {
    let mut all = Vec::with_capacity(inputs.len());
    for input in inputs {
        all.push(ElfImage::parse(input.name.clone(), input.bytes.clone())?);
    }

    let reference_idx = all.iter().position(ElfImage::is_implicit_reference);
    let reference_addresses = reference_idx
        .map(|idx| all[idx].build_reference_addresses())
        .unwrap_or_default();

    let mut elfs: Vec<ElfImage> = all
        .into_iter()
        .enumerate()
        .filter_map(|(idx, elf)| (Some(idx) != reference_idx).then_some(elf))
        .collect();

    let mut layout = layout::build_layout(&mut elfs)?;
    let mut table = symtab::build_symbol_table(&mut elfs)?;
    symtab::resolve_addresses(&mut table, &elfs, &layout, &reference_addresses)?;

    let hook_sites =
        hooks::insert_hooks(&mut elfs, &table, &mut layout, &reference_addresses, options)?;

    relocate::apply_relocations(&mut elfs, &table, &mut layout, options)?;

    emit::emit(&elfs, &table, &layout, options, &hook_sites)
}
