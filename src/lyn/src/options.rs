/* SPDX-FileCopyrightText: © 2025-2026 lyn contributors */
/* SPDX-License-Identifier: MIT */

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
    struct Flags: u8 {
        const LINK = 1 << 0;
        const LONGCALLS = 1 << 1;
        const HOOK = 1 << 2;
        const TEMP = 1 << 3;
    }
}

/// Toggles controlling how the pipeline resolves relocations and emits
/// symbols, mirroring the CLI's `-link`/`-longcalls`/`-hook`/`-temp` flags.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct LinkOptions {
    flags: Flags,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            flags: Flags::LINK | Flags::HOOK,
        }
    }
}

impl LinkOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `-nolink -nolongcalls -nohook`.
    #[must_use]
    pub fn raw() -> Self {
        Self {
            flags: Flags::empty(),
        }
    }

    #[must_use]
    pub fn link(&self) -> bool {
        self.flags.contains(Flags::LINK)
    }

    #[must_use]
    pub fn longcalls(&self) -> bool {
        self.flags.contains(Flags::LONGCALLS)
    }

    #[must_use]
    pub fn hook(&self) -> bool {
        self.flags.contains(Flags::HOOK)
    }

    #[must_use]
    pub fn temp(&self) -> bool {
        self.flags.contains(Flags::TEMP)
    }

    #[must_use]
    pub fn with_link(mut self, value: bool) -> Self {
        self.flags.set(Flags::LINK, value);
        self
    }

    #[must_use]
    pub fn with_longcalls(mut self, value: bool) -> Self {
        self.flags.set(Flags::LONGCALLS, value);
        self
    }

    #[must_use]
    pub fn with_hook(mut self, value: bool) -> Self {
        self.flags.set(Flags::HOOK, value);
        self
    }

    #[must_use]
    pub fn with_temp(mut self, value: bool) -> Self {
        self.flags.set(Flags::TEMP, value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_matches_cli_defaults() {
        let opts = LinkOptions::default();
        assert_eq!(opts.link(), true);
        assert_eq!(opts.longcalls(), false);
        assert_eq!(opts.hook(), true);
        assert_eq!(opts.temp(), false);
    }

    #[test]
    fn raw_disables_link_longcalls_hook() {
        let opts = LinkOptions::raw();
        assert_eq!(opts.link(), false);
        assert_eq!(opts.longcalls(), false);
        assert_eq!(opts.hook(), false);
    }

    #[test]
    fn builder_methods_chain() {
        let opts = LinkOptions::new().with_link(false).with_temp(true);
        assert_eq!(opts.link(), false);
        assert_eq!(opts.temp(), true);
    }
}
