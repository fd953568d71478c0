//! Secret providers for keycheck configuration.

pub mod providers;

pub use providers::{EnvProvider, FileProvider, SecretProvider, SecretValue};
