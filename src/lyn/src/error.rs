/* SPDX-FileCopyrightText: © 2025-2026 lyn contributors */
/* SPDX-License-Identifier: MIT */

use core::{error, fmt};

use crate::elf::ElfError;
use crate::relocation::RelocError;

/// Aggregate error returned by [`crate::link`].
///
/// Each phase of the pipeline owns a small local error enum near the code
/// that raises it; this type collects them behind `From` conversions so the
/// public entry point can return a single `Result`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LynError {
    /// Only ever constructed by the CLI front-end when loading input files;
    /// the library itself performs no I/O.
    Io(String),
    Elf(ElfError),
    Reloc(RelocError),
    MultiplyDefined(String),
    WritableSectionLayout(String),
    RelocationToDiscarded,
    RelocationToCommon(String),
    HookNotInRom(String),
    HookNotAFunction(String),
    CallOutOfRange(String),
}

impl fmt::Display for LynError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LynError::Io(msg) => write!(f, "{msg}"),
            LynError::Elf(x) => write!(f, "{x}"),
            LynError::Reloc(x) => write!(f, "{x}"),
            LynError::MultiplyDefined(name) => {
                write!(f, "Multiple definitions of symbol '{name}'")
            }
            LynError::WritableSectionLayout(name) => {
                write!(f, "Cannot lay out writable section '{name}'")
            }
            LynError::RelocationToDiscarded => {
                write!(f, "Relocation refers to a discarded section")
            }
            LynError::RelocationToCommon(name) => {
                write!(f, "Relocation refers to common symbol '{name}', which is unsupported")
            }
            LynError::HookNotInRom(name) => {
                write!(f, "Hook target '{name}' is not a ROM address")
            }
            LynError::HookNotAFunction(name) => {
                write!(f, "Hook target '{name}' is not a function symbol")
            }
            LynError::CallOutOfRange(name) => {
                write!(
                    f,
                    "Call to '{name}' is out of range and -longcalls is not enabled"
                )
            }
        }
    }
}

impl error::Error for LynError {}

impl From<ElfError> for LynError {
    fn from(value: ElfError) -> Self {
        LynError::Elf(value)
    }
}

impl From<RelocError> for LynError {
    fn from(value: RelocError) -> Self {
        LynError::Reloc(value)
    }
}

impl From<std::io::Error> for LynError {
    fn from(value: std::io::Error) -> Self {
        LynError::Io(value.to_string())
    }
}
