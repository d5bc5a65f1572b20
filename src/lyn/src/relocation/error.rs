/* SPDX-FileCopyrightText: © 2025-2026 lyn contributors */
/* SPDX-License-Identifier: MIT */

use core::{error, fmt};

/// Errors raised by the relocation codec and applier.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RelocError {
    UnhandledRelocation(u32),
}

impl fmt::Display for RelocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelocError::UnhandledRelocation(kind) => {
                write!(f, "Unhandled relocation type {kind}")
            }
        }
    }
}

impl error::Error for RelocError {}
