//! Maps `Box<dyn Error>` from trait boundaries to typed `TurretError`.
//!
//! The traits in `turret_traits` use `Box<dyn Error + Send + Sync>` so back
//! ends can carry their own error types; this module converts those to our
//! typed error enum, with an optional feature-gated path for
//! `turret_hardware::HwError` downcasting.

use crate::error::TurretError;

/// Map a trait-boundary error to a typed `TurretError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> TurretError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<turret_hardware::error::HwError>() {
            return match hw {
                turret_hardware::error::HwError::Timeout => TurretError::Timeout,
                other => TurretError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        TurretError::Timeout
    } else {
        TurretError::Hardware(s)
    }
}

/// `map_hw_error` wrapped into a report, for `map_err` at call sites.
pub(crate) fn report(e: Box<dyn std::error::Error + Send + Sync>) -> eyre::Report {
    eyre::Report::new(map_hw_error(&*e))
}
