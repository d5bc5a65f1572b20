/* SPDX-FileCopyrightText: © 2025-2026 lyn contributors */
/* SPDX-License-Identifier: MIT */

use super::byte_utils::{read_le_u16, read_le_u32};
use super::error::ElfError;
use super::raw::{
    self, EHDR_SIZE, ELFCLASS32, ELFDATA2LSB, ELFDATA2MSB, ELFMAG, EM_ARM, EI_CLASS, EI_DATA,
    EI_MAG0, E_MACHINE, E_SHENTSIZE, E_SHNUM, E_SHOFF, SHDR_SIZE, SHT_REL, SHT_RELA, SHT_SYMTAB,
};

/// Validates an ELF image and, if it is big-endian, byte-swaps every
/// multi-byte field in place so later code can treat the buffer as native
/// little-endian.
///
/// This is the only phase that mutates the input bytes; everything
/// downstream borrows the sanitized buffer immutably.
pub fn sanitize(bytes: &mut [u8]) -> Result<(), ElfError> {
    if bytes.len() < EHDR_SIZE {
        return Err(ElfError::Truncated);
    }
    if bytes[EI_MAG0..EI_MAG0 + 4] != ELFMAG {
        return Err(ElfError::NotElf);
    }
    if bytes[EI_CLASS] != ELFCLASS32 {
        return Err(ElfError::NotElf32);
    }

    let data = bytes[EI_DATA];
    if data == ELFDATA2MSB {
        swap_all(bytes)?;
    } else if data != ELFDATA2LSB {
        return Err(ElfError::NotLittleEndian);
    }

    if read_le_u16(&bytes[E_MACHINE..]) != EM_ARM {
        return Err(ElfError::NotArm32);
    }

    Ok(())
}

fn swap_all(bytes: &mut [u8]) -> Result<(), ElfError> {
    raw::swap_ehdr(&mut bytes[..EHDR_SIZE]);

    let sh_off = read_le_u32(&bytes[E_SHOFF..]) as usize;
    let sh_entsize = read_le_u16(&bytes[E_SHENTSIZE..]) as usize;
    let sh_num = read_le_u16(&bytes[E_SHNUM..]) as usize;

    if sh_entsize < SHDR_SIZE {
        return Err(ElfError::Truncated);
    }
    for i in 0..sh_num {
        let start = sh_off + i * sh_entsize;
        let end = start
            .checked_add(SHDR_SIZE)
            .ok_or(ElfError::Truncated)?;
        if end > bytes.len() {
            return Err(ElfError::Truncated);
        }
        raw::swap_shdr(&mut bytes[start..end]);
    }

    // Second pass: now that section headers are native-endian, swap the
    // entries of every SYMTAB/REL/RELA section's contents.
    for i in 0..sh_num {
        let hdr_start = sh_off + i * sh_entsize;
        let hdr = raw::SectionHeader::new(&bytes[hdr_start..hdr_start + SHDR_SIZE]);
        let sh_type = hdr.sh_type();
        let data_off = hdr.offset() as usize;
        let data_size = hdr.size() as usize;
        let entsize = hdr.entsize() as usize;

        if sh_type == SHT_SYMTAB && entsize >= raw::SYM_SIZE {
            swap_entries(bytes, data_off, data_size, entsize, raw::swap_sym)?;
        } else if sh_type == SHT_REL && entsize >= raw::REL_SIZE {
            swap_entries(bytes, data_off, data_size, entsize, raw::swap_rel)?;
        } else if sh_type == SHT_RELA && entsize >= raw::RELA_SIZE {
            swap_entries(bytes, data_off, data_size, entsize, raw::swap_rela)?;
        }
    }

    Ok(())
}

fn swap_entries(
    bytes: &mut [u8],
    data_off: usize,
    data_size: usize,
    entsize: usize,
    swap_one: fn(&mut [u8]),
) -> Result<(), ElfError> {
    let end = data_off.checked_add(data_size).ok_or(ElfError::Truncated)?;
    if end > bytes.len() {
        return Err(ElfError::Truncated);
    }
    let count = data_size / entsize;
    for i in 0..count {
        let start = data_off + i * entsize;
        swap_one(&mut bytes[start..start + entsize]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn minimal_be_ehdr() -> Vec<u8> {
        let mut h = vec![0u8; EHDR_SIZE];
        h[0..4].copy_from_slice(&ELFMAG);
        h[EI_CLASS] = ELFCLASS32;
        h[EI_DATA] = ELFDATA2MSB;
        h[E_MACHINE..E_MACHINE + 2].copy_from_slice(&EM_ARM.to_be_bytes());
        h[E_SHOFF..E_SHOFF + 4].copy_from_slice(&0u32.to_be_bytes());
        h[E_SHENTSIZE..E_SHENTSIZE + 2].copy_from_slice(&(SHDR_SIZE as u16).to_be_bytes());
        h[E_SHNUM..E_SHNUM + 2].copy_from_slice(&0u16.to_be_bytes());
        h
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = vec![0u8; EHDR_SIZE];
        assert_eq!(sanitize(&mut bytes), Err(ElfError::NotElf));
    }

    #[test]
    fn rejects_truncated() {
        let mut bytes = vec![0u8; 4];
        assert_eq!(sanitize(&mut bytes), Err(ElfError::Truncated));
    }

    #[test]
    fn swaps_big_endian_header_to_native() {
        let mut bytes = minimal_be_ehdr();
        sanitize(&mut bytes).unwrap();
        assert_eq!(read_le_u16(&bytes[E_MACHINE..]), EM_ARM);
    }
}
