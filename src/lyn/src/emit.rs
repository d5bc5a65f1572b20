/* SPDX-FileCopyrightText: © 2025-2026 lyn contributors */
/* SPDX-License-Identifier: MIT */

use std::collections::HashSet;
use std::fmt::Write as _;

use crate::address::{Address, Anchor, ROM_BASE, ROM_END};
use crate::elf::ElfImage;
use crate::error::LynError;
use crate::event::{EventBlock, EventCode, EventCodeKind};
use crate::layout::LayoutSection;
use crate::options::LinkOptions;
use crate::relocation::{self, RelocationInfo};
use crate::symtab::{GlobalSymbol, SymScope};

/// Assembles the final Event Assembler text for a fully-resolved link:
/// preamble labels, then one framed block per layout section, then any
/// hook veneers.
pub fn emit(
    elfs: &[ElfImage],
    table: &[GlobalSymbol],
    layout: &[LayoutSection],
    options: LinkOptions,
    hook_sites: &[(usize, Address)],
) -> Result<String, LynError> {
    let mut out = String::new();
    let referenced = referenced_symbol_names(elfs);

    write_preamble(&mut out, table, &referenced, options);

    let hook_layout_indices: HashSet<usize> = hook_sites.iter().map(|(idx, _)| *idx).collect();

    let mut float_cursor: i64 = 0;
    for (layout_idx, section) in layout.iter().enumerate() {
        if hook_layout_indices.contains(&layout_idx) {
            continue;
        }
        emit_section(&mut out, elfs, table, section, &mut float_cursor)?;
    }

    for &(layout_idx, hook_addr) in hook_sites {
        let section = &layout[layout_idx];
        emit_hook(&mut out, elfs, table, section, hook_addr)?;
    }

    Ok(out)
}

fn referenced_symbol_names(elfs: &[ElfImage]) -> HashSet<usize> {
    let mut set = HashSet::new();
    for elf in elfs {
        for sec in &elf.sections {
            for pending in &sec.pending {
                set.insert(pending.global_sym);
            }
        }
    }
    set
}

fn write_preamble(
    out: &mut String,
    table: &[GlobalSymbol],
    referenced: &HashSet<usize>,
    options: LinkOptions,
) {
    let _ = writeln!(out, "ALIGN 4");

    let mut float_syms: Vec<(usize, &GlobalSymbol)> = table
        .iter()
        .enumerate()
        .filter(|(idx, s)| {
            let Some(addr) = s.address else { return false };
            if addr.anchor() != Anchor::FloatRom {
                return false;
            }
            match s.scope {
                SymScope::Local => options.temp() || referenced.contains(idx),
                SymScope::Global | SymScope::Undefined => true,
            }
        })
        .filter(|(_, s)| !s.name.is_empty())
        .collect();
    float_syms.sort_by_key(|(_, s)| s.address.unwrap().raw_offset());

    let mut cursor: i64 = 0;
    for (_, sym) in &float_syms {
        let target = sym.address.unwrap().raw_offset();
        let delta = target - cursor;
        if delta == 0 {
            let _ = writeln!(out, "ORG CURRENTOFFSET ; {}:", sym.name);
        } else if delta > 0 {
            let _ = writeln!(out, "ORG CURRENTOFFSET+{delta} ; {}:", sym.name);
        } else {
            let _ = writeln!(out, "ORG CURRENTOFFSET-{} ; {}:", -delta, sym.name);
        }
        cursor = target;
    }

    let mut abs_syms: Vec<&GlobalSymbol> = table
        .iter()
        .filter(|s| {
            matches!(s.scope, SymScope::Global)
                && !s.name.is_empty()
                && matches!(s.address.map(Address::anchor), Some(Anchor::Absolute))
        })
        .collect();
    abs_syms.sort_by_key(|s| s.address.unwrap().raw_offset());

    for sym in abs_syms {
        let offset = sym.address.unwrap().raw_offset();
        if (ROM_BASE..ROM_END).contains(&offset) {
            let _ = writeln!(out, "ORG 0x{offset:X} ; {}:", sym.name);
        } else {
            let _ = writeln!(out, "#define {} 0x{:X}", sym.name, offset);
        }
    }
}

fn emit_section(
    out: &mut String,
    elfs: &[ElfImage],
    table: &[GlobalSymbol],
    section: &LayoutSection,
    float_cursor: &mut i64,
) -> Result<(), LynError> {
    let data = elfs[section.elf_idx].section_data(section.sec_idx);
    let pending = &elfs[section.elf_idx].sections[section.sec_idx].pending;
    let mut block = EventBlock::new(data.len());

    for p in pending {
        let info = relocation::lookup(p.rel_type)?;
        let field = &data[p.offset as usize..p.offset as usize + info.byte_len()];
        let addend = info.extract(field);
        let code = synthesize_code(table, &info, section, p.offset, p.global_sym, addend, field)?;
        block.map_code(p.offset as usize, info.byte_len(), code);
    }
    block.pack();
    block.optimize();

    match section.address.anchor() {
        Anchor::FloatRom => {
            if *float_cursor % 4 != 0 {
                let _ = writeln!(out, "ALIGN 4");
                *float_cursor = (*float_cursor + 3) / 4 * 4;
            }
            write_block(out, &block, data);
            *float_cursor += section.size as i64;
        }
        Anchor::Absolute => {
            let offset = section.address.raw_offset();
            if (ROM_BASE..ROM_END).contains(&offset) {
                let _ = writeln!(out, "PUSH");
                let _ = writeln!(out, "ORG 0x{offset:X}");
                write_block(out, &block, data);
                let _ = writeln!(out, "POP");
            }
        }
    }

    Ok(())
}

fn emit_hook(
    out: &mut String,
    elfs: &[ElfImage],
    table: &[GlobalSymbol],
    section: &LayoutSection,
    hook_addr: Address,
) -> Result<(), LynError> {
    let data = elfs[section.elf_idx].section_data(section.sec_idx);
    let pending = &elfs[section.elf_idx].sections[section.sec_idx].pending;
    let mut block = EventBlock::new(data.len());
    for p in pending {
        let info = relocation::lookup(p.rel_type)?;
        let field = &data[p.offset as usize..p.offset as usize + info.byte_len()];
        let addend = info.extract(field);
        let code = synthesize_code(table, &info, section, p.offset, p.global_sym, addend, field)?;
        block.map_code(p.offset as usize, info.byte_len(), code);
    }
    block.pack();
    block.optimize();

    let file_offset = hook_addr.rom_file_offset() & !1;
    let _ = writeln!(out, "PUSH");
    let _ = writeln!(out, "ORG 0x{:X}", ROM_BASE + file_offset);
    write_block(out, &block, data);
    let _ = writeln!(out, "POP");
    Ok(())
}

fn write_block(out: &mut String, block: &EventBlock, data: &[u8]) {
    let mut offset = 0usize;
    while offset < block.size() {
        if let Some(run_len) = block.mapped_run_at(offset) {
            let code = block.code_at(offset).expect("run start has a mapped code");
            let misaligned = code.kind.alignment() != 0 && offset as u32 % code.kind.alignment() != 0;
            let keyword = code.directive_keyword(misaligned);
            let _ = writeln!(out, "{keyword} {}", code.args.join(" "));
            offset += run_len;
            continue;
        }

        let run_start = offset;
        let mut run_end = offset;
        while run_end < block.size() && block.code_at(run_end).is_none() {
            run_end += 1;
        }
        emit_raw_run(out, &data[run_start..run_end], run_start as u32);
        offset = run_end;
    }
}

fn emit_raw_run(out: &mut String, bytes: &[u8], start_offset: u32) {
    let mut i = 0usize;
    while i < bytes.len() {
        let aligned4 = (start_offset as usize + i) % 4 == 0;
        if aligned4 && bytes.len() - i >= 4 {
            let words: Vec<String> = bytes[i..]
                .chunks(4)
                .take_while(|c| c.len() == 4)
                .map(|c| {
                    let v = u32::from_le_bytes([c[0], c[1], c[2], c[3]]);
                    render_unsigned(v as i64)
                })
                .collect();
            let _ = writeln!(out, "WORD {}", words.join(" "));
            i += words.len() * 4;
        } else if bytes.len() - i >= 2 {
            let halves: Vec<String> = bytes[i..]
                .chunks(2)
                .take_while(|c| c.len() == 2)
                .map(|c| {
                    let v = u16::from_le_bytes([c[0], c[1]]);
                    render_unsigned(v as i64)
                })
                .collect();
            let _ = writeln!(out, "SHORT {}", halves.join(" "));
            i += halves.len() * 2;
        } else {
            let bytes_str: Vec<String> = bytes[i..].iter().map(|&b| render_unsigned(b as i64)).collect();
            let _ = writeln!(out, "BYTE {}", bytes_str.join(" "));
            i = bytes.len();
        }
    }
}

/// Renders an unsigned magnitude: hex when `>= 16`, decimal otherwise.
fn render_unsigned(v: i64) -> String {
    if v < 16 {
        format!("{v}")
    } else {
        format!("${v:X}")
    }
}

/// Renders a signed addend the same way, with an explicit sign.
fn render_signed(v: i64) -> String {
    let mag = v.unsigned_abs() as i64;
    let rendered = render_unsigned(mag);
    if v < 0 {
        format!("-{rendered}")
    } else {
        rendered
    }
}

fn needs_parens(expr: &str) -> bool {
    expr.bytes()
        .enumerate()
        .any(|(i, b)| i > 0 && matches!(b, b'+' | b'-' | b'*' | b'/' | b'&' | b'|' | b'^'))
}

fn wrap(expr: &str) -> String {
    if needs_parens(expr) {
        format!("({expr})")
    } else {
        expr.to_string()
    }
}

/// Builds the textual expression for one pending relocation, per the
/// emitter's synthesis algorithm (steps 1-7): resolve the symbol to a name
/// or `CURRENTOFFSET`, fold in the addend, wrap relative relocations with
/// `- CURRENTOFFSET`, then render each bitfield part.
fn synthesize_code(
    table: &[GlobalSymbol],
    info: &RelocationInfo,
    section: &LayoutSection,
    rel_offset: u32,
    global_sym: usize,
    mut addend: i64,
    field: &[u8],
) -> Result<EventCode, LynError> {
    let sym = &table[global_sym];
    let mut currentoffset_anchor = false;

    let mut target_expr = if !sym.name.is_empty() {
        sym.name.clone()
    } else if let Some(sym_addr) = sym.address {
        addend += sym_addr.raw_offset();
        if sym_addr.anchor() == section.address.anchor() {
            addend -= section.address.raw_offset() + rel_offset as i64;
            currentoffset_anchor = true;
            "CURRENTOFFSET".to_string()
        } else {
            String::new()
        }
    } else {
        String::new()
    };

    target_expr = if target_expr.is_empty() {
        render_signed(addend)
    } else if addend == 0 {
        target_expr
    } else if addend > 0 {
        format!("{target_expr}+{}", render_unsigned(addend))
    } else {
        format!("{target_expr}-{}", render_unsigned(-addend))
    };

    if info.is_relative() {
        target_expr = format!("{} - CURRENTOFFSET", wrap(&target_expr));
        currentoffset_anchor = true;
    }

    let mut args = Vec::with_capacity(info.parts().len());
    for (part_idx, part) in info.parts().iter().enumerate() {
        let start = part_idx * info.part_size() as usize;
        let slot = match info.part_size() {
            1 => field[start] as u32,
            2 => u16::from_le_bytes([field[start], field[start + 1]]) as u32,
            4 => u32::from_le_bytes([
                field[start],
                field[start + 1],
                field[start + 2],
                field[start + 3],
            ]),
            _ => unreachable!(),
        };
        let base = slot & !part.mask();

        let shift = part.effective_shift();
        let mut expr = if shift == 0 {
            wrap(&target_expr)
        } else if shift > 0 {
            format!("({} >> {shift})", wrap(&target_expr))
        } else {
            format!("({} << {})", wrap(&target_expr), -shift)
        };

        let slot_bits = info.part_size() as u32 * 8;
        let mask_covers_whole_slot = part.bit_offset() == 0 && part.bit_size() >= slot_bits;
        if !mask_covers_whole_slot {
            expr = format!("({expr} & {})", part.mask());
        }

        if base != 0 {
            expr = format!("{expr} | {base}");
        }

        args.push(expr);
    }

    let kind = EventCodeKind::from_relocation_shape(info.part_size(), info.is_relative());
    Ok(EventCode::new(kind, args, currentoffset_anchor))
}
