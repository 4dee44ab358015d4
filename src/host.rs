//! Host ABI capability
//!
//! The host reports which ABIs it can run and whether the current process is
//! 64-bit. Older platforms report an ordered primary/secondary pair; newer
//! ones report an unordered set, which is reordered by process bitness
//! before use. Pick the implementation once at startup with [`detect`].

use crate::abi::{
    prefer_process_bitness, SupportedAbis, ABI_ARM64_V8A, ABI_ARMEABI_V7A, ABI_X86, ABI_X86_64,
};
use tracing::debug;

/// Capability exposing the host's supported ABIs
pub trait HostAbi: Send + Sync {
    /// Supported ABIs, most preferred first
    fn supported_abis(&self) -> SupportedAbis;

    /// Whether the running process is 64-bit
    fn process_is_64bit(&self) -> bool;
}

/// Host exposing an inherently ordered primary/secondary ABI pair
#[derive(Debug, Clone)]
pub struct LegacyHost {
    primary: String,
    secondary: Option<String>,
    is_64bit: bool,
}

impl LegacyHost {
    /// Create a legacy host; an empty `secondary` is kept as an empty slot
    #[must_use]
    pub fn new(primary: impl Into<String>, secondary: Option<String>, is_64bit: bool) -> Self {
        Self {
            primary: primary.into(),
            secondary,
            is_64bit,
        }
    }
}

impl HostAbi for LegacyHost {
    fn supported_abis(&self) -> SupportedAbis {
        SupportedAbis::new(vec![Some(self.primary.clone()), self.secondary.clone()])
    }

    fn process_is_64bit(&self) -> bool {
        self.is_64bit
    }
}

/// Host exposing an unordered set of ABIs
#[derive(Debug, Clone)]
pub struct MultiAbiHost {
    abis: Vec<String>,
    is_64bit: bool,
}

impl MultiAbiHost {
    /// Create a host from its ABI set and process bitness
    #[must_use]
    pub fn new(abis: Vec<String>, is_64bit: bool) -> Self {
        Self { abis, is_64bit }
    }
}

impl HostAbi for MultiAbiHost {
    fn supported_abis(&self) -> SupportedAbis {
        prefer_process_bitness(self.abis.clone(), self.is_64bit)
            .into_iter()
            .collect()
    }

    fn process_is_64bit(&self) -> bool {
        self.is_64bit
    }
}

/// ABI label for a Rust target architecture name
#[must_use]
pub fn abi_for_arch(arch: &str) -> Option<&'static str> {
    match arch {
        "aarch64" => Some(ABI_ARM64_V8A),
        "arm" => Some(ABI_ARMEABI_V7A),
        "x86_64" => Some(ABI_X86_64),
        "x86" => Some(ABI_X86),
        _ => None,
    }
}

/// ABIs a process on `arch` can load, native first
fn native_abi_set(arch: &str) -> Vec<String> {
    let abis: &[&str] = match arch {
        "aarch64" => &[ABI_ARM64_V8A, ABI_ARMEABI_V7A, "armeabi"],
        "arm" => &[ABI_ARMEABI_V7A, "armeabi"],
        "x86_64" => &[ABI_X86_64, ABI_X86],
        "x86" => &[ABI_X86],
        _ => &[],
    };
    abis.iter().map(|abi| (*abi).to_string()).collect()
}

/// Select the host capability for the running process
///
/// A non-empty `overrides` list is treated as an unordered ABI set. Otherwise
/// the set is derived from the compile-time architecture; architectures with
/// no known ABI fall back to a legacy host whose only slot is the raw
/// architecture name.
#[must_use]
pub fn detect(overrides: &[String]) -> Box<dyn HostAbi> {
    let is_64bit = cfg!(target_pointer_width = "64");
    if !overrides.is_empty() {
        debug!("using overridden ABI set: {:?}", overrides);
        return Box::new(MultiAbiHost::new(overrides.to_vec(), is_64bit));
    }

    let arch = std::env::consts::ARCH;
    let abis = native_abi_set(arch);
    if abis.is_empty() {
        debug!("no known ABI for architecture {arch}, using legacy host");
        return Box::new(LegacyHost::new(arch, None, is_64bit));
    }
    debug!("detected ABI set {:?} for architecture {arch}", abis);
    Box::new(MultiAbiHost::new(abis, is_64bit))
}
