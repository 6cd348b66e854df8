//! Mapping the host platform onto a documentation binary.
//!
//! Binaries follow the `<product>-<os>-<arch>[.exe]` naming scheme. Only
//! Windows, macOS and Linux on x64 or arm64 are published; anything else is a
//! fatal startup error.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, CoreResult};

/// Operating systems with a published binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Windows.
    Win,
    /// macOS.
    Darwin,
    /// Linux.
    Linux,
}

impl Platform {
    /// Map an OS identifier (`std::env::consts::OS` or Node-style) to a platform.
    pub fn from_os(os: &str) -> Option<Self> {
        match os {
            "windows" | "win32" | "win" => Some(Self::Win),
            "macos" | "darwin" => Some(Self::Darwin),
            "linux" => Some(Self::Linux),
            _ => None,
        }
    }

    /// Name used in binary file names.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Win => "win",
            Self::Darwin => "darwin",
            Self::Linux => "linux",
        }
    }

    /// Executable suffix for this platform.
    pub fn exe_suffix(self) -> &'static str {
        match self {
            Self::Win => ".exe",
            Self::Darwin | Self::Linux => "",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU architectures with a published binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    /// 64-bit x86.
    X64,
    /// 64-bit ARM.
    Arm64,
}

impl Arch {
    /// Map an architecture identifier (`std::env::consts::ARCH` or Node-style).
    pub fn from_arch(arch: &str) -> Option<Self> {
        match arch {
            "x86_64" | "x64" => Some(Self::X64),
            "aarch64" | "arm64" => Some(Self::Arm64),
            _ => None,
        }
    }

    /// Name used in binary file names.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X64 => "x64",
            Self::Arm64 => "arm64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves the documentation binary for the running host.
#[derive(Debug, Clone)]
pub struct BinaryResolver {
    product: String,
    bin_dir: PathBuf,
}

impl BinaryResolver {
    /// Create a resolver for `product` binaries stored in `bin_dir`.
    pub fn new(product: impl Into<String>, bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            product: product.into(),
            bin_dir: bin_dir.into(),
        }
    }

    /// Directory holding the binaries.
    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    /// Binary file name for an explicit OS/architecture pair.
    pub fn binary_name_for(&self, os: &str, arch: &str) -> CoreResult<String> {
        let platform = Platform::from_os(os);
        let cpu = Arch::from_arch(arch);
        match (platform, cpu) {
            (Some(platform), Some(cpu)) => Ok(format!(
                "{}-{}-{}{}",
                self.product,
                platform,
                cpu,
                platform.exe_suffix()
            )),
            _ => Err(CoreError::unsupported_platform(os, arch)),
        }
    }

    /// Binary file name for the running host.
    pub fn binary_name(&self) -> CoreResult<String> {
        self.binary_name_for(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Full path of the binary for the running host.
    ///
    /// The file is not required to exist; a missing binary shows up later as
    /// a spawn failure.
    pub fn resolve(&self) -> CoreResult<PathBuf> {
        Ok(self.bin_dir.join(self.binary_name()?))
    }
}
