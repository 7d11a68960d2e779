//! Human-readable error descriptions, exit codes and structured JSON errors.

use turret_core::error::{BuildError, TurretError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingYaw | BuildError::MissingPitch => format!(
                "What happened: The turret was built without an axis ({be}).\nLikely causes: Encoder or motor driver failed to initialize.\nHow to fix: Check the yaw/pitch entries in [pins] and the wiring."
            ),
            BuildError::MissingCamera | BuildError::MissingExtractor => format!(
                "What happened: No thermal camera was available ({be}).\nLikely causes: Camera not detected on the bus.\nHow to fix: Check camera power and wiring, then rerun `turret self-check`."
            ),
            BuildError::MissingLauncher => {
                "What happened: No launcher was provided.\nLikely causes: Arm/trigger outputs failed to initialize.\nHow to fix: Check launcher_arm and launcher_trigger in [pins].".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(te) = err.downcast_ref::<TurretError>() {
        return match te {
            TurretError::Timeout => "What happened: Thermal camera capture timed out.\nLikely causes: Camera not powered, bus wiring issues, or camera.capture_timeout_ms shorter than one frame.\nHow to fix: Verify the camera wiring and raise camera.capture_timeout_ms in the config.".to_string(),
            TurretError::Config(msg) if msg.contains("calibration CSV must have headers") => {
                "Invalid headers in calibration CSV. Expected 'column,angle'.".to_string()
            }
            TurretError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
            TurretError::Hardware(msg) | TurretError::HardwareFault(msg) => format!(
                "What happened: Device fault ({msg}).\nLikely causes: Motor bridge, encoder or launcher wiring, or missing GPIO permissions.\nHow to fix: Check [pins] and the wiring. Motors were zeroed and the launcher disarmed before exit."
            ),
        };
    }

    // Generic fallback
    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 2 for device faults, 3 for configuration, 1 otherwise.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 3;
    }
    match err.downcast_ref::<TurretError>() {
        Some(TurretError::Config(_)) => 3,
        Some(TurretError::Hardware(_) | TurretError::HardwareFault(_) | TurretError::Timeout) => 2,
        _ => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    match err.downcast_ref::<TurretError>() {
        Some(TurretError::Config(_)) => "Config",
        Some(TurretError::Timeout) => "Timeout",
        Some(TurretError::Hardware(_) | TurretError::HardwareFault(_)) => "HardwareFault",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
