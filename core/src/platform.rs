//! file: core/src/platform.rs
//! description: compile-time-flavored platform identity used to gate
//! calling-convention validation and the "hidden first parameter" ABI rule.
//!
//! The original C++ source dispatches on preprocessor macros
//! (`PLUGIFY_PLATFORM_WINDOWS`, `PLUGIFY_ARCH_BITS`, ...). Here that becomes
//! a plain enum so descriptor validation can be exercised against any
//! platform from a test, not just the host the test binary happens to run on.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Windows,
    Linux,
    Macos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X86,
    X86_64,
    Arm,
    Arm64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    pub const fn new(os: Os, arch: Arch) -> Self {
        Platform { os, arch }
    }

    /// The platform this binary was actually compiled for.
    pub fn host() -> Self {
        let os = match std::env::consts::OS {
            "windows" => Os::Windows,
            "macos" => Os::Macos,
            _ => Os::Linux,
        };
        let arch = match std::env::consts::ARCH {
            "x86" => Arch::X86,
            "aarch64" => Arch::Arm64,
            "arm" => Arch::Arm,
            _ => Arch::X86_64,
        };
        Platform { os, arch }
    }

    pub fn ptr_width(&self) -> u8 {
        match self.arch {
            Arch::X86 | Arch::Arm => 32,
            Arch::X86_64 | Arch::Arm64 => 64,
        }
    }

    /// Tag used in descriptor `supportedPlatforms` lists and remote manifest
    /// `platforms` sets. Exact-match comparison only, per spec.
    pub fn tag(&self) -> &'static str {
        match (self.os, self.arch) {
            (Os::Windows, Arch::X86_64) => "windows-x86_64",
            (Os::Windows, Arch::X86) => "windows-x86",
            (Os::Linux, Arch::X86_64) => "linux-x86_64",
            (Os::Linux, Arch::Arm64) => "linux-aarch64",
            (Os::Macos, Arch::X86_64) => "macos-x86_64",
            (Os::Macos, Arch::Arm64) => "macos-aarch64",
            _ => "unknown",
        }
    }

    /// Allowed calling-convention strings for this platform. `None` means
    /// "any string is accepted, unchecked".
    pub fn allowed_calling_conventions(&self) -> Option<&'static [&'static str]> {
        match (self.os, self.arch, self.ptr_width()) {
            (Os::Windows, Arch::X86_64, 64) => Some(&["vectorcall"]),
            (_, Arch::X86_64, 64) => None,
            (_, Arch::X86, 32) => Some(&["cdecl", "stdcall", "fastcall", "thiscall", "vectorcall"]),
            (_, Arch::Arm, 32) => Some(&["soft", "hard"]),
            (_, Arch::Arm64, 64) => None,
            _ => None,
        }
    }

    /// First struct `ValueType` that gets passed as a hidden first parameter
    /// (return-by-reference ABI). Differs by platform, deliberately not
    /// unified — see DESIGN.md.
    pub fn hidden_param_start(&self) -> crate::value_type::ValueType {
        use crate::value_type::ValueType;
        match self.os {
            Os::Windows => ValueType::Vector3,
            _ => ValueType::Matrix4x4,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_x64_only_allows_vectorcall() {
        let p = Platform::new(Os::Windows, Arch::X86_64);
        assert_eq!(p.allowed_calling_conventions(), Some(&["vectorcall"][..]));
    }

    #[test]
    fn linux_x64_is_unchecked() {
        let p = Platform::new(Os::Linux, Arch::X86_64);
        assert_eq!(p.allowed_calling_conventions(), None);
    }

    #[test]
    fn x86_allows_the_classic_four_plus_vectorcall() {
        let p = Platform::new(Os::Windows, Arch::X86);
        assert_eq!(
            p.allowed_calling_conventions(),
            Some(&["cdecl", "stdcall", "fastcall", "thiscall", "vectorcall"][..])
        );
    }

    #[test]
    fn arm32_allows_soft_and_hard() {
        let p = Platform::new(Os::Linux, Arch::Arm);
        assert_eq!(p.allowed_calling_conventions(), Some(&["soft", "hard"][..]));
    }

    #[test]
    fn hidden_param_start_differs_by_platform() {
        use crate::value_type::ValueType;
        assert_eq!(
            Platform::new(Os::Windows, Arch::X86_64).hidden_param_start(),
            ValueType::Vector3
        );
        assert_eq!(
            Platform::new(Os::Linux, Arch::X86_64).hidden_param_start(),
            ValueType::Matrix4x4
        );
    }
}
