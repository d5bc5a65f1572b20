/* SPDX-FileCopyrightText: © 2025-2026 lyn contributors */
/* SPDX-License-Identifier: MIT */

use super::error::ElfError;
use super::raw::{self, SectionHeader, SHF_ALLOC, SHN_ABS, SHN_UNDEF, SHT_NULL, STB_LOCAL, STT_FUNC};

/// A pending relocation recorded against one section, in the section's own
/// byte-offset space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pending {
    pub offset: u32,
    pub rel_type: u32,
    pub global_sym: usize,
}

/// One section of one input ELF, as seen by the rest of the pipeline.
#[derive(Debug, Clone)]
pub struct ElfSectionRef {
    pub index: usize,
    pub name: String,
    pub sh_type: u32,
    pub flags: u32,
    pub data_offset: u32,
    pub data_size: u32,
    pub link: u32,
    pub info: u32,
    pub entsize: u32,
    /// Index into the layout vector, once the layout engine has run.
    pub layout_index: Option<usize>,
    /// Relocations collected against this section, sorted by offset once
    /// the relocation applier has run.
    pub pending: Vec<Pending>,
}

impl ElfSectionRef {
    #[must_use]
    pub fn is_retained(&self) -> bool {
        self.data_size != 0 && (self.flags & SHF_ALLOC) != 0
    }

    #[must_use]
    pub fn is_writable(&self) -> bool {
        (self.flags & raw::SHF_WRITE) != 0
    }
}

/// A sanitized, validated ELF input, with section headers parsed eagerly.
///
/// Section *contents* and the string/symbol tables are read lazily through
/// accessors borrowing the same buffer, since most of it (e.g. `.debug*`) is
/// never touched.
pub struct ElfImage {
    pub display_name: String,
    bytes: Vec<u8>,
    pub sections: Vec<ElfSectionRef>,
    /// Per-SHT_SYMTAB-section-index: the global symbol table index chosen
    /// for each local symbol. Populated by the symbol table builder.
    pub sym_indirection: Vec<Option<Vec<usize>>>,
}

impl ElfImage {
    pub fn parse(display_name: impl Into<String>, mut bytes: Vec<u8>) -> Result<Self, ElfError> {
        super::sanitize::sanitize(&mut bytes)?;

        let sh_off = raw::read_le_u32(&bytes[raw::E_SHOFF..]) as usize;
        let sh_entsize = raw::read_le_u16(&bytes[raw::E_SHENTSIZE..]) as usize;
        let sh_num = raw::read_le_u16(&bytes[raw::E_SHNUM..]) as usize;

        if sh_entsize < raw::SHDR_SIZE {
            return Err(ElfError::Truncated);
        }

        let mut sections = Vec::with_capacity(sh_num);
        for i in 0..sh_num {
            let start = sh_off + i * sh_entsize;
            let end = start
                .checked_add(raw::SHDR_SIZE)
                .ok_or(ElfError::Truncated)?;
            if end > bytes.len() {
                return Err(ElfError::Truncated);
            }
            let hdr = SectionHeader::new(&bytes[start..end]);
            sections.push(ElfSectionRef {
                index: i,
                name: String::new(),
                sh_type: hdr.sh_type(),
                flags: hdr.flags(),
                data_offset: hdr.offset(),
                data_size: if hdr.sh_type() == raw::SHT_NOBITS {
                    0
                } else {
                    hdr.size()
                },
                link: hdr.link(),
                info: hdr.info(),
                entsize: hdr.entsize(),
                layout_index: None,
                pending: Vec::new(),
            });
        }

        let shstrndx = raw::read_le_u16(&bytes[raw::E_SHSTRNDX..]) as usize;
        let sym_indirection = vec![None; sections.len()];
        let mut image = Self {
            display_name: display_name.into(),
            bytes,
            sections,
            sym_indirection,
        };

        if shstrndx != 0 && shstrndx < image.sections.len() {
            for i in 0..image.sections.len() {
                let name_off = {
                    let start = sh_off + i * sh_entsize;
                    SectionHeader::new(&image.bytes[start..start + raw::SHDR_SIZE]).name_off()
                };
                let name = image.string_at(shstrndx, name_off).unwrap_or_default();
                image.sections[i].name = name;
            }
        }

        Ok(image)
    }

    #[must_use]
    pub fn raw_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn section_data(&self, sec_idx: usize) -> &[u8] {
        let sec = &self.sections[sec_idx];
        let start = sec.data_offset as usize;
        let end = start + sec.data_size as usize;
        &self.bytes[start..end]
    }

    pub fn section_data_mut(&mut self, sec_idx: usize) -> &mut [u8] {
        let sec = &self.sections[sec_idx];
        let start = sec.data_offset as usize;
        let end = start + sec.data_size as usize;
        &mut self.bytes[start..end]
    }

    /// Reads a null-terminated string at `offset` within section `strtab_idx`.
    /// Returns `None` if `strtab_idx` is out of range; returns the empty
    /// string (rather than erroring) if `offset` runs past the table.
    #[must_use]
    pub fn string_at(&self, strtab_idx: usize, offset: u32) -> Option<String> {
        let sec = self.sections.get(strtab_idx)?;
        let start = sec.data_offset as usize + offset as usize;
        if start >= self.bytes.len() {
            return Some(String::new());
        }
        let end = self.bytes[start..]
            .iter()
            .position(|&b| b == 0)
            .map(|p| start + p)
            .unwrap_or(self.bytes.len());
        Some(String::from_utf8_lossy(&self.bytes[start..end]).into_owned())
    }

    /// Number of entries in a section given its recorded entry size.
    #[must_use]
    pub fn entry_count(&self, sec_idx: usize) -> usize {
        let sec = &self.sections[sec_idx];
        if sec.entsize == 0 {
            0
        } else {
            (sec.data_size / sec.entsize) as usize
        }
    }

    /// True when this ELF carries no allocated, sized sections and every
    /// non-local symbol is either undefined or absolute: a table of
    /// reference addresses rather than a patch to emit.
    #[must_use]
    pub fn is_implicit_reference(&self) -> bool {
        for sec in &self.sections {
            if sec.sh_type != SHT_NULL && sec.is_retained() {
                return false;
            }
        }
        for sec in &self.sections {
            if sec.sh_type != raw::SHT_SYMTAB {
                continue;
            }
            let count = self.entry_count(sec.index);
            for i in 0..count {
                let sym = self.symbol(sec.index, i);
                if sym.bind() == STB_LOCAL {
                    continue;
                }
                let shndx = sym.shndx();
                if shndx != SHN_UNDEF && shndx != SHN_ABS {
                    return false;
                }
            }
        }
        true
    }

    /// Builds the `name -> (absolute address, is_function)` map this ELF
    /// contributes as a reference ELF. Ignores local symbols and anything
    /// not `SHN_ABS`.
    #[must_use]
    pub fn build_reference_addresses(&self) -> std::collections::HashMap<String, (u32, bool)> {
        let mut map = std::collections::HashMap::new();
        for sec in &self.sections {
            if sec.sh_type != raw::SHT_SYMTAB {
                continue;
            }
            let count = self.entry_count(sec.index);
            for i in 0..count {
                let sym = self.symbol(sec.index, i);
                if sym.bind() == STB_LOCAL || sym.shndx() != SHN_ABS {
                    continue;
                }
                if let Some(name) = self.string_at(sec.link as usize, sym.name_off()) {
                    if !name.is_empty() {
                        map.insert(name, (sym.value(), Self::is_function_symbol(&sym)));
                    }
                }
            }
        }
        map
    }

    #[must_use]
    pub fn symbol(&self, symtab_idx: usize, sym_idx: usize) -> raw::SymEntry<'_> {
        let sec = &self.sections[symtab_idx];
        let start = sec.data_offset as usize + sym_idx * sec.entsize as usize;
        let end = start + raw::SYM_SIZE;
        raw::SymEntry::new(&self.bytes[start..end])
    }

    #[must_use]
    pub fn is_function_symbol(sym: &raw::SymEntry<'_>) -> bool {
        sym.sym_type() == STT_FUNC
    }

    /// Appends `data` as a new allocated, non-writable `PROGBITS` section
    /// (a hook or long-call veneer) and returns its section index.
    pub fn append_synthetic_section(&mut self, name: impl Into<String>, data: &[u8]) -> usize {
        let data_offset = self.bytes.len() as u32;
        self.bytes.extend_from_slice(data);
        let index = self.sections.len();
        self.sections.push(ElfSectionRef {
            index,
            name: name.into(),
            sh_type: raw::SHT_PROGBITS,
            flags: SHF_ALLOC,
            data_offset,
            data_size: data.len() as u32,
            link: 0,
            info: 0,
            entsize: 0,
            layout_index: None,
            pending: Vec::new(),
        });
        self.sym_indirection.push(None);
        index
    }
}
