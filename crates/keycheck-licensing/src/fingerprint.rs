//! Host-derived machine fingerprints.

use sha2::{Digest, Sha256};

/// Machine fingerprint used when none is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineFingerprint {
    /// Fingerprint sent to the licensing service.
    pub id: String,
    /// Hostname.
    pub hostname: String,
    /// Platform.
    pub platform: String,
}

impl MachineFingerprint {
    /// Generate fingerprint for current machine.
    pub fn current() -> Self {
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        Self::from_parts(hostname, std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Derive a fingerprint from explicit host facts.
    pub fn from_parts(hostname: impl Into<String>, os: &str, arch: &str) -> Self {
        let hostname = hostname.into();
        let platform = format!("{}-{}", os, arch);

        let mut hasher = Sha256::new();
        hasher.update(hostname.as_bytes());
        hasher.update([0u8]);
        hasher.update(platform.as_bytes());
        let id = hex::encode(hasher.finalize());

        Self {
            id,
            hostname,
            platform,
        }
    }
}
