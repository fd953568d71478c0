//! keycheck core
//!
//! Domain types, the license service port, and error handling shared by
//! the HTTP adapter and the command-line client.

pub mod error;
pub mod license;
pub mod ports;

pub use error::{Error, Result};
pub use license::{License, Machine, Validation, ValidationCode, ValidationResult};
pub use ports::LicenseService;
