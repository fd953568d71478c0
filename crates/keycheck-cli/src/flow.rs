//! Validate, activate if needed, then deactivate.

use crate::config::Settings;
use keycheck_core::{Error, LicenseService, Result, Validation, ValidationCode};
use tracing::{info, warn};

/// What a completed run observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Validity from the last validation of the run.
    pub valid: bool,
    /// Reason code from the last validation of the run.
    pub code: ValidationCode,
    /// Whether this run activated the device.
    pub activated: bool,
    /// Machine created by this run, if any.
    pub machine_id: Option<String>,
}

pub fn validity_label(valid: bool) -> &'static str {
    if valid { "Valid" } else { "Invalid" }
}

/// Run the license check against `service`.
///
/// Any error returns immediately; in particular a failed validation or
/// activation skips deactivation.
pub async fn run<S>(service: &S, settings: &Settings) -> Result<RunReport>
where
    S: LicenseService + ?Sized,
{
    let first = validate(service, settings).await?;

    let (last, machine) = if first.result.code.requires_activation() {
        let license = first.license.as_ref().ok_or(Error::MissingLicense)?;

        let machine = service
            .activate_device(&license.id, &settings.fingerprint, &settings.activation_token)
            .await?;
        info!(machine_id = %machine.id, license_id = %license.id, "Device activated");

        // One re-check, its outcome is reported but not acted on.
        let refreshed = validate(service, settings).await?;
        (refreshed, Some(machine))
    } else {
        (first, None)
    };

    let report = RunReport {
        valid: last.result.valid,
        code: last.result.code,
        activated: machine.is_some(),
        machine_id: machine.map(|m| m.id),
    };

    info!(
        status = validity_label(report.valid),
        activated = report.activated,
        "License check finished"
    );

    service
        .deactivate_device(&settings.fingerprint, &settings.activation_token)
        .await?;
    info!(fingerprint = %settings.fingerprint, "Device deactivated");

    Ok(report)
}

async fn validate<S>(service: &S, settings: &Settings) -> Result<Validation>
where
    S: LicenseService + ?Sized,
{
    let validation = service
        .validate_license(&settings.license_key, &settings.fingerprint)
        .await?;

    let result = &validation.result;
    if result.valid {
        info!(detail = %result.detail, code = %result.code, "{}", validity_label(true));
    } else {
        warn!(detail = %result.detail, code = %result.code, "{}", validity_label(false));
    }

    Ok(validation)
}
