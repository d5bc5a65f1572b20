/* SPDX-FileCopyrightText: © 2025-2026 lyn contributors */
/* SPDX-License-Identifier: MIT */

//! ELF32 ingestion: byte utilities, raw structure layout, endian
//! sanitization, and the in-memory image the rest of the pipeline reads.
pub mod byte_utils;
mod error;
mod image;
pub mod raw;
mod sanitize;

pub use error::ElfError;
pub use image::{ElfImage, ElfSectionRef, Pending};
pub use sanitize::sanitize;
