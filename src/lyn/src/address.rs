/* SPDX-FileCopyrightText: © 2025-2026 lyn contributors */
/* SPDX-License-Identifier: MIT */

use core::fmt;

/// The origin an [`Address`] is measured from.
///
/// Only the two anchors the layout engine actually assigns are implemented;
/// a writable-RAM anchor and a "discarded" anchor are deliberately not
/// modeled here (see the layout engine's Non-goals).
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Anchor {
    /// A fixed virtual address, e.g. an existing ROM function.
    Absolute,
    /// A position within the patch this run emits, not yet assigned a base.
    FloatRom,
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anchor::Absolute => write!(f, "absolute"),
            Anchor::FloatRom => write!(f, "float-rom"),
        }
    }
}

/// An offset relative to an [`Anchor`].
///
/// For `FloatRom` the offset is only meaningful relative to other `FloatRom`
/// addresses until the layout engine assigns final positions; for
/// `Absolute` the offset is the address itself.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Address {
    anchor: Anchor,
    offset: i64,
}

/// Start of the GBA ROM address window in the cartridge's memory map.
pub const ROM_BASE: i64 = 0x0800_0000;
/// End (exclusive) of the GBA ROM address window.
pub const ROM_END: i64 = 0x0A00_0000;

impl Address {
    #[must_use]
    pub const fn new(anchor: Anchor, offset: i64) -> Self {
        Self { anchor, offset }
    }

    #[must_use]
    pub const fn absolute(offset: i64) -> Self {
        Self::new(Anchor::Absolute, offset)
    }

    #[must_use]
    pub const fn float_rom(offset: i64) -> Self {
        Self::new(Anchor::FloatRom, offset)
    }

    #[must_use]
    pub const fn anchor(&self) -> Anchor {
        self.anchor
    }

    #[must_use]
    pub const fn raw_offset(&self) -> i64 {
        self.offset
    }

    /// Returns a new address sharing this one's anchor, shifted by `delta`.
    #[must_use]
    pub const fn offset(&self, delta: i64) -> Self {
        Self::new(self.anchor, self.offset + delta)
    }

    /// True if this is an absolute address inside the GBA ROM window.
    #[must_use]
    pub const fn is_rom_absolute(&self) -> bool {
        matches!(self.anchor, Anchor::Absolute)
            && self.offset >= ROM_BASE
            && self.offset < ROM_END
    }

    /// File offset of an in-ROM absolute address (address with the ROM base
    /// bit cleared).
    #[must_use]
    pub const fn rom_file_offset(&self) -> i64 {
        self.offset - ROM_BASE
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+0x{:X}", self.anchor, self.offset)
    }
}
