//! Configuration validation.
//!
//! Checks every `[data]`, `[optimizer]` and `[strategy]` field before a run.
//! Per-slot `[slotN]` overrides are checked while the strategy is built.

use crate::domain::error::GeneratorError;
use crate::domain::indicator::registry;
use crate::domain::param::SlotRole;
use crate::domain::strategy::{OppositeDirSignalAction, SameDirSignalAction, SlotStatus};
use crate::ports::config_port::ConfigPort;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), GeneratorError> {
    validate_data_config(config)?;
    validate_optimizer_config(config)?;
    validate_strategy_config(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), GeneratorError> {
    require_non_empty(config, "data", "dir")?;
    require_non_empty(config, "data", "symbol")?;
    let digits = config.get_int("data", "digits", 5);
    if !(0..=10).contains(&digits) {
        return Err(invalid("data", "digits", "digits must be between 0 and 10"));
    }
    Ok(())
}

pub fn validate_optimizer_config(config: &dyn ConfigPort) -> Result<(), GeneratorError> {
    if config.get_int("optimizer", "seed", 0) < 0 {
        return Err(invalid("optimizer", "seed", "seed must be non-negative"));
    }
    if config.get_int("optimizer", "rounds", 1) < 1 {
        return Err(invalid("optimizer", "rounds", "rounds must be at least 1"));
    }
    if config.get_int("optimizer", "max_numeric_rounds", 5) < 1 {
        return Err(invalid(
            "optimizer",
            "max_numeric_rounds",
            "max_numeric_rounds must be at least 1",
        ));
    }
    if config.get_int("optimizer", "time_limit_secs", 0) < 0 {
        return Err(invalid(
            "optimizer",
            "time_limit_secs",
            "time_limit_secs must be non-negative",
        ));
    }
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), GeneratorError> {
    validate_slots(config)?;
    validate_properties(config)?;
    for key in ["permanent_sl", "permanent_tp", "break_even"] {
        if config.get_int("strategy", key, 0) < 0 {
            return Err(invalid("strategy", key, &format!("{key} must be non-negative")));
        }
    }
    Ok(())
}

fn validate_slots(config: &dyn ConfigPort) -> Result<(), GeneratorError> {
    let slots = config.get_list("strategy", "slots", ',');
    if slots.is_empty() {
        return Err(GeneratorError::ConfigMissing {
            section: "strategy".to_string(),
            key: "slots".to_string(),
        });
    }
    for entry in &slots {
        let (role, name) = parse_slot_entry(entry)?;
        let indicator = registry::construct(name).map_err(|_| {
            invalid("strategy", "slots", &format!("unknown indicator '{name}'"))
        })?;
        if !indicator.supports(role) {
            return Err(invalid(
                "strategy",
                "slots",
                &format!("{name} cannot be used as {}", role.label()),
            ));
        }
    }
    Ok(())
}

fn validate_properties(config: &dyn ConfigPort) -> Result<(), GeneratorError> {
    if let Some(value) = config.get_string("strategy", "properties_status") {
        if SlotStatus::parse(&value).is_none() {
            return Err(invalid(
                "strategy",
                "properties_status",
                "expected open, locked or linked",
            ));
        }
    }
    if let Some(value) = config.get_string("strategy", "same_signal_action") {
        if SameDirSignalAction::parse(&value).is_none() {
            return Err(invalid(
                "strategy",
                "same_signal_action",
                "expected nothing, winner or add",
            ));
        }
    }
    if let Some(value) = config.get_string("strategy", "opposite_signal_action") {
        if OppositeDirSignalAction::parse(&value).is_none() {
            return Err(invalid(
                "strategy",
                "opposite_signal_action",
                "expected nothing, reduce, close or reverse",
            ));
        }
    }
    Ok(())
}

/// Splits a `role:Indicator Name` entry of `[strategy] slots`.
pub fn parse_slot_entry(entry: &str) -> Result<(SlotRole, &str), GeneratorError> {
    let (role, name) = entry.split_once(':').ok_or_else(|| {
        invalid(
            "strategy",
            "slots",
            &format!("'{entry}' is not of the form role:indicator"),
        )
    })?;
    let role = SlotRole::parse(role)
        .filter(|r| *r != SlotRole::NotDefined)
        .ok_or_else(|| {
            invalid("strategy", "slots", &format!("unknown slot role '{}'", role.trim()))
        })?;
    Ok((role, name.trim()))
}

fn require_non_empty(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<(), GeneratorError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(GeneratorError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

pub(crate) fn invalid(section: &str, key: &str, reason: &str) -> GeneratorError {
    GeneratorError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
