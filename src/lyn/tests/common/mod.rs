/* SPDX-FileCopyrightText: © 2025-2026 lyn contributors */
/* SPDX-License-Identifier: MIT */

//! A minimal ELF32 ARM little-endian builder for whole-pipeline tests.
//!
//! Only the handful of fields `lyn` reads are populated; this is not a
//! general-purpose ELF writer.

pub const STB_LOCAL: u8 = 0;
pub const STB_GLOBAL: u8 = 1;
pub const STB_WEAK: u8 = 2;
pub const STT_NOTYPE: u8 = 0;
pub const STT_FUNC: u8 = 2;

pub const SHN_UNDEF: u16 = 0;
pub const SHN_ABS: u16 = 0xfff1;

const SHT_NULL: u32 = 0;
const SHT_PROGBITS: u32 = 1;
const SHT_SYMTAB: u32 = 2;
const SHT_STRTAB: u32 = 3;
const SHT_REL: u32 = 9;

const SHF_WRITE: u32 = 0x1;
const SHF_ALLOC: u32 = 0x2;

pub struct RawSym {
    pub name: String,
    pub value: u32,
    pub bind: u8,
    pub sym_type: u8,
    pub shndx: u16,
}

pub struct RelocEntry {
    pub offset: u32,
    pub sym_index: u32,
    pub rel_type: u32,
}

pub struct RawSection {
    pub name: String,
    pub data: Vec<u8>,
    pub writable: bool,
    pub relocs: Vec<RelocEntry>,
}

#[derive(Default)]
pub struct ElfBuilder {
    sections: Vec<RawSection>,
    symbols: Vec<RawSym>,
}

impl ElfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a retained `PROGBITS`, `ALLOC` section and returns its
    /// 1-based section index (section 0 is always the implicit `NULL`).
    pub fn add_section(&mut self, name: &str, data: Vec<u8>) -> usize {
        self.sections.push(RawSection {
            name: name.to_string(),
            data,
            writable: false,
            relocs: Vec::new(),
        });
        self.sections.len()
    }

    pub fn add_relocation(&mut self, sec_idx: usize, offset: u32, sym_index: u32, rel_type: u32) {
        self.sections[sec_idx - 1].relocs.push(RelocEntry {
            offset,
            sym_index,
            rel_type,
        });
    }

    /// Adds a symbol and returns its symbol table index.
    pub fn add_symbol(&mut self, name: &str, value: u32, bind: u8, sym_type: u8, shndx: u16) -> u32 {
        self.symbols.push(RawSym {
            name: name.to_string(),
            value,
            bind,
            sym_type,
            shndx,
        });
        self.symbols.len() as u32
    }

    pub fn build(&self) -> Vec<u8> {
        // Symbol 0 is always the null symbol.
        let mut strtab = vec![0u8];
        let mut sym_name_offsets = Vec::with_capacity(self.symbols.len());
        for sym in &self.symbols {
            sym_name_offsets.push(strtab.len() as u32);
            strtab.extend_from_slice(sym.name.as_bytes());
            strtab.push(0);
        }

        let mut symtab = vec![0u8; 16]; // null symbol
        for (sym, name_off) in self.symbols.iter().zip(&sym_name_offsets) {
            symtab.extend_from_slice(&name_off.to_le_bytes());
            symtab.extend_from_slice(&sym.value.to_le_bytes());
            symtab.extend_from_slice(&0u32.to_le_bytes()); // st_size
            symtab.push((sym.bind << 4) | sym.sym_type);
            symtab.push(0); // st_other
            symtab.extend_from_slice(&sym.shndx.to_le_bytes());
        }

        // Section layout: 0=NULL, 1..=N user sections (with optional
        // companion .rel sections interleaved right after), then SYMTAB,
        // STRTAB, SHSTRTAB.
        struct Built {
            name: String,
            sh_type: u32,
            flags: u32,
            data: Vec<u8>,
            link: u32,
            info: u32,
            entsize: u32,
        }

        let mut built = vec![Built {
            name: String::new(),
            sh_type: SHT_NULL,
            flags: 0,
            data: Vec::new(),
            link: 0,
            info: 0,
            entsize: 0,
        }];

        let mut rel_sections = Vec::new();
        for (i, sec) in self.sections.iter().enumerate() {
            let own_idx = built.len() as u32;
            built.push(Built {
                name: sec.name.clone(),
                sh_type: SHT_PROGBITS,
                flags: if sec.writable {
                    SHF_ALLOC | SHF_WRITE
                } else {
                    SHF_ALLOC
                },
                data: sec.data.clone(),
                link: 0,
                info: 0,
                entsize: 0,
            });
            if !sec.relocs.is_empty() {
                rel_sections.push((i, own_idx));
            }
        }

        let symtab_idx = built.len() as u32;
        built.push(Built {
            name: ".symtab".to_string(),
            sh_type: SHT_SYMTAB,
            flags: 0,
            data: symtab,
            link: 0, // patched below
            info: 0,
            entsize: 16,
        });

        for (sec_i, target_idx) in rel_sections {
            let sec = &self.sections[sec_i];
            let mut data = Vec::with_capacity(sec.relocs.len() * 8);
            for r in &sec.relocs {
                data.extend_from_slice(&r.offset.to_le_bytes());
                let info = (r.sym_index << 8) | (r.rel_type & 0xff);
                data.extend_from_slice(&info.to_le_bytes());
            }
            built.push(Built {
                name: format!(".rel{}", sec.name),
                sh_type: SHT_REL,
                flags: 0,
                data,
                link: symtab_idx,
                info: target_idx,
                entsize: 8,
            });
        }

        let strtab_idx = built.len() as u32;
        built.push(Built {
            name: ".strtab".to_string(),
            sh_type: SHT_STRTAB,
            flags: 0,
            data: strtab,
            link: 0,
            info: 0,
            entsize: 0,
        });

        built[symtab_idx as usize].link = strtab_idx;

        let mut shstrtab = vec![0u8];
        let mut name_offsets = Vec::with_capacity(built.len() + 1);
        for b in &built {
            name_offsets.push(shstrtab.len() as u32);
            shstrtab.extend_from_slice(b.name.as_bytes());
            shstrtab.push(0);
        }
        let shstrtab_name_off = shstrtab.len() as u32;
        shstrtab.extend_from_slice(b".shstrtab");
        shstrtab.push(0);

        let shstrndx = built.len() as u32;
        built.push(Built {
            name: ".shstrtab".to_string(),
            sh_type: SHT_STRTAB,
            flags: 0,
            data: shstrtab,
            link: 0,
            info: 0,
            entsize: 0,
        });
        name_offsets.push(shstrtab_name_off);

        const EHDR_SIZE: usize = 52;
        const SHDR_SIZE: usize = 40;
        let sh_off = EHDR_SIZE;
        let mut data_off = sh_off + built.len() * SHDR_SIZE;

        let mut data_offsets = Vec::with_capacity(built.len());
        for b in &built {
            data_offsets.push(data_off as u32);
            data_off += b.data.len();
        }

        let mut out = Vec::with_capacity(data_off);
        out.extend_from_slice(&[0x7f, b'E', b'L', b'F']);
        out.push(1); // ELFCLASS32
        out.push(1); // ELFDATA2LSB
        out.push(1); // EI_VERSION
        out.extend_from_slice(&[0u8; 9]); // pad
        out.extend_from_slice(&1u16.to_le_bytes()); // e_type = ET_REL
        out.extend_from_slice(&40u16.to_le_bytes()); // e_machine = EM_ARM
        out.extend_from_slice(&1u32.to_le_bytes()); // e_version
        out.extend_from_slice(&0u32.to_le_bytes()); // e_entry
        out.extend_from_slice(&0u32.to_le_bytes()); // e_phoff
        out.extend_from_slice(&(sh_off as u32).to_le_bytes()); // e_shoff
        out.extend_from_slice(&0u32.to_le_bytes()); // e_flags
        out.extend_from_slice(&(EHDR_SIZE as u16).to_le_bytes()); // e_ehsize
        out.extend_from_slice(&0u16.to_le_bytes()); // e_phentsize
        out.extend_from_slice(&0u16.to_le_bytes()); // e_phnum
        out.extend_from_slice(&(SHDR_SIZE as u16).to_le_bytes()); // e_shentsize
        out.extend_from_slice(&(built.len() as u16).to_le_bytes()); // e_shnum
        out.extend_from_slice(&(shstrndx as u16).to_le_bytes()); // e_shstrndx
        assert_eq!(out.len(), EHDR_SIZE);

        for (i, b) in built.iter().enumerate() {
            out.extend_from_slice(&name_offsets[i].to_le_bytes());
            out.extend_from_slice(&b.sh_type.to_le_bytes());
            out.extend_from_slice(&b.flags.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes()); // sh_addr
            out.extend_from_slice(&data_offsets[i].to_le_bytes());
            out.extend_from_slice(&(b.data.len() as u32).to_le_bytes());
            out.extend_from_slice(&b.link.to_le_bytes());
            out.extend_from_slice(&b.info.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes()); // sh_addralign
            out.extend_from_slice(&b.entsize.to_le_bytes());
        }

        for b in &built {
            out.extend_from_slice(&b.data);
        }

        out
    }
}
