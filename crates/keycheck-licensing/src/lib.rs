//! Keygen license validation and machine activation for keycheck.

pub mod fingerprint;
pub mod keygen;

pub use fingerprint::MachineFingerprint;
pub use keygen::{KeygenClient, KeygenConfig};
