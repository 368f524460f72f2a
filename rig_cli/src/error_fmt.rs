//! Human-readable error descriptions and structured JSON error formatting.

use rig_core::error::RigError;
use rig_hardware::error::HwError;

/// Exit code for a data-ready timeout.
pub const EXIT_TIMEOUT: i32 = 3;
/// Exit code for EEPROM image failures.
pub const EXIT_STORAGE: i32 = 4;
/// Exit code for rejected operator input.
pub const EXIT_INPUT: i32 = 5;

/// Coarse classification shared by the exit code and the JSON `reason`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Timeout,
    Storage,
    Input,
    Other,
}

fn classify(err: &eyre::Report) -> Kind {
    if let Some(re) = err.downcast_ref::<RigError>() {
        return match re {
            RigError::Timeout => Kind::Timeout,
            RigError::Storage(_) => Kind::Storage,
            RigError::Input(_) => Kind::Input,
            _ => Kind::Other,
        };
    }
    if let Some(hw) = err.downcast_ref::<HwError>() {
        return match hw {
            HwError::DataReadyTimeout => Kind::Timeout,
            HwError::Storage(_) => Kind::Storage,
            _ => Kind::Other,
        };
    }
    Kind::Other
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(re) = err.downcast_ref::<RigError>() {
        return match re {
            RigError::Timeout => TIMEOUT_TEXT.to_string(),
            RigError::Storage(msg) => format!(
                "What happened: Calibration storage failed ({msg}).\nLikely causes: storage.eeprom_path is not writable, or storage.capacity/base_address do not fit the record.\nHow to fix: Check the path and permissions, and the [storage] section of the config."
            ),
            RigError::Input(e) => format!(
                "What happened: The number entered was rejected ({e}).\nLikely causes: A typo, a second separator, or a sign after the first digit.\nHow to fix: Enter a plain decimal such as 1.5 or 1,5."
            ),
            RigError::State(msg) => format!(
                "What happened: {msg}.\nLikely causes: The known weight was not on the sensor when the reading was taken.\nHow to fix: Rerun `rig calibrate` and load the sensor before entering the weight."
            ),
            RigError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/rig.toml for a sample."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    if let Some(hw) = err.downcast_ref::<HwError>() {
        return match hw {
            HwError::DataReadyTimeout => TIMEOUT_TEXT.to_string(),
            HwError::UnsupportedGain(g) => format!(
                "What happened: Gain {g} is not supported.\nLikely causes: loadcell.gain is not one of 128, 64, 32.\nHow to fix: Set loadcell.gain to 128 (channel A), 64 (channel A) or 32 (channel B)."
            ),
            HwError::Gpio(msg) | HwError::Interrupt(msg) => format!(
                "What happened: Failed to initialize hardware pins ({msg}).\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process has permission to access GPIO."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug for details."
            ),
        };
    }

    // String-based heuristics for errors coming from config loading
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("read config") {
        return format!(
            "What happened: Could not read the config file.\nLikely causes: Wrong --config path.\nHow to fix: Pass --config <FILE> or create etc/rig.toml. Original: {msg}"
        );
    }

    if lower.contains("invalid configuration")
        || lower.contains("must")
        || (lower.contains("pin") && lower.contains("missing"))
    {
        return format!(
            "What happened: Configuration is invalid or incomplete.\nLikely causes: Missing [pins] (hx711_dt, hx711_sck), or out-of-range values.\nHow to fix: Edit the TOML config and try again. Original: {msg}"
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

const TIMEOUT_TEXT: &str = "What happened: HX711 did not produce data within the configured timeout.\nLikely causes: Wrong DT/SCK pins, wiring/power issues, or timeout configured too low.\nHow to fix: Check [pins] in the config, verify VCC/GND, and raise loadcell.ready_timeout_ms.";

/// Stable exit codes: timeout 3, storage 4, input 5, anything else 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match classify(err) {
        Kind::Timeout => EXIT_TIMEOUT,
        Kind::Storage => EXIT_STORAGE,
        Kind::Input => EXIT_INPUT,
        Kind::Other => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let reason = match classify(err) {
        Kind::Timeout => "Timeout",
        Kind::Storage => "Storage",
        Kind::Input => "Input",
        Kind::Other => "Error",
    };
    json!({
        "reason": reason,
        "code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rig_core::error::InputError;

    #[test]
    fn codes_follow_error_kind() {
        assert_eq!(exit_code_for_error(&RigError::Timeout.into()), 3);
        assert_eq!(exit_code_for_error(&HwError::DataReadyTimeout.into()), 3);
        assert_eq!(
            exit_code_for_error(&RigError::Storage("disk".into()).into()),
            4
        );
        assert_eq!(
            exit_code_for_error(&RigError::Input(InputError::MisplacedSign).into()),
            5
        );
        assert_eq!(exit_code_for_error(&eyre::eyre!("boom")), 1);
    }

    #[test]
    fn json_carries_reason_and_code() {
        let v: serde_json::Value =
            serde_json::from_str(&format_error_json(&HwError::DataReadyTimeout.into())).unwrap();
        assert_eq!(v["reason"], "Timeout");
        assert_eq!(v["code"], 3);
        assert!(v["message"].as_str().unwrap().starts_with("What happened"));
    }
}
