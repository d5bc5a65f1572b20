/* SPDX-FileCopyrightText: © 2025-2026 lyn contributors */
/* SPDX-License-Identifier: MIT */

use super::error::RelocError;
use super::info::RelocationInfo;
use super::part::RelocationPart;

pub const R_ARM_NONE: u32 = 0;
pub const R_ARM_ABS32: u32 = 2;
pub const R_ARM_REL32: u32 = 3;
pub const R_ARM_ABS16: u32 = 5;
pub const R_ARM_ABS8: u32 = 8;
pub const R_ARM_THM_CALL: u32 = 10;
pub const R_ARM_CALL: u32 = 28;
pub const R_ARM_JUMP24: u32 = 29;
pub const R_ARM_V4BX: u32 = 40;
pub const R_ARM_THM_JUMP11: u32 = 102;
pub const R_ARM_THM_JUMP8: u32 = 103;

/// Looks up the codec descriptor for an ARM32 relocation type number.
///
/// `R_ARM_V4BX` has no descriptor (it carries no value to encode; callers
/// should skip it rather than call this) and returns
/// [`RelocError::UnhandledRelocation`] the same as a genuinely unknown
/// number, since the *caller* is the one that knows to special-case it.
pub fn lookup(rel_type: u32) -> Result<RelocationInfo, RelocError> {
    let info = match rel_type {
        R_ARM_ABS32 => RelocationInfo::new(false, 4, 0, vec![RelocationPart::new(0, 32, 0)]),
        R_ARM_REL32 => RelocationInfo::new(true, 4, 31, vec![RelocationPart::new(0, 32, 0)]),
        R_ARM_ABS16 => RelocationInfo::new(false, 2, 0, vec![RelocationPart::new(0, 16, 0)]),
        R_ARM_ABS8 => RelocationInfo::new(false, 1, 0, vec![RelocationPart::new(0, 8, 0)]),
        R_ARM_THM_CALL => RelocationInfo::new(
            true,
            2,
            22,
            vec![RelocationPart::new(0, 11, 12), RelocationPart::new(0, 11, 1)],
        ),
        R_ARM_CALL | R_ARM_JUMP24 => {
            RelocationInfo::new(true, 4, 25, vec![RelocationPart::new(0, 24, 2)])
        }
        R_ARM_THM_JUMP11 => {
            RelocationInfo::new(true, 2, 11, vec![RelocationPart::new(0, 11, 1)])
        }
        R_ARM_THM_JUMP8 => RelocationInfo::new(true, 2, 8, vec![RelocationPart::new(0, 8, 1)]),
        other => return Err(RelocError::UnhandledRelocation(other)),
    };
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unknown_kind_is_an_error() {
        assert_eq!(lookup(9999), Err(RelocError::UnhandledRelocation(9999)));
    }

    #[test]
    fn v4bx_has_no_descriptor() {
        assert!(lookup(R_ARM_V4BX).is_err());
    }

    #[test]
    fn abs32_is_not_relative() {
        let info = lookup(R_ARM_ABS32).unwrap();
        assert_eq!(info.is_relative(), false);
        assert_eq!(info.part_size(), 4);
    }
}
