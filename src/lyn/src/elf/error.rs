/* SPDX-FileCopyrightText: © 2025-2026 lyn contributors */
/* SPDX-License-Identifier: MIT */

use core::{error, fmt};

/// Errors raised while sanitizing and modeling a single ELF input.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ElfError {
    NotElf,
    NotElf32,
    NotLittleEndian,
    NotArm32,
    Truncated,
    BadStringTable,
    BadSectionLink(u32),
    BadEntrySize(u32),
}

impl fmt::Display for ElfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElfError::NotElf => write!(f, "Input is not an ELF file"),
            ElfError::NotElf32 => write!(f, "Input is not a 32-bit ELF file"),
            ElfError::NotLittleEndian => write!(f, "Input ELF has an unrecognized byte order"),
            ElfError::NotArm32 => write!(f, "Input ELF is not for the ARM architecture"),
            ElfError::Truncated => write!(f, "Input ELF is truncated"),
            ElfError::BadStringTable => write!(f, "Input ELF has a malformed string table"),
            ElfError::BadSectionLink(idx) => {
                write!(f, "Section links to out-of-range section {idx}")
            }
            ElfError::BadEntrySize(idx) => {
                write!(f, "Section {idx} has an inconsistent entry size")
            }
        }
    }
}

impl error::Error for ElfError {}
