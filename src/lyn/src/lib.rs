/* SPDX-FileCopyrightText: © 2025-2026 lyn contributors */
/* SPDX-License-Identifier: MIT */

//! `lyn` turns a set of relocatable ARM32 ELF32 objects into an Event
//! Assembler script: a specialized static linker whose output is assembly
//! text rather than a linked binary.
//!
//! The pipeline: sanitize each ELF's endianness ([`elf`]), lay out retained
//! sections ([`layout`]), merge global symbols ([`symtab`]), apply or defer
//! relocations ([`relocate`], codec in [`relocation`]), insert hook and
//! long-call veneers ([`hooks`]), and render the result ([`emit`], IR in
//! [`event`]). [`link`] drives all of it; everything else is exposed for
//! embedding and direct unit testing.

pub mod address;
pub mod elf;
mod emit;
mod error;
pub mod event;
mod hooks;
pub mod layout;
pub mod options;
mod pipeline;
mod relocate;
pub mod relocation;
pub mod symtab;

pub use error::LynError;
pub use options::LinkOptions;
pub use pipeline::{link, NamedElf};
