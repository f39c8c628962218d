//! Builds domain values from a [`ConfigPort`].

use crate::domain::config_validation::{invalid, parse_slot_entry, validate_config};
use crate::domain::dataset::InstrumentProperties;
use crate::domain::error::GeneratorError;
use crate::domain::optimizer::OptimizerOptions;
use crate::domain::param::{CHECK_PARAMS, LIST_PARAMS, NUMERIC_PARAMS};
use crate::domain::strategy::{
    IndicatorSlot, OppositeDirSignalAction, Protection, SameDirSignalAction, SlotStatus, Strategy,
};
use crate::ports::config_port::ConfigPort;
use std::path::PathBuf;
use std::time::Duration;

/// Where price history comes from and how it is quoted.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    pub dir: PathBuf,
    pub instrument: InstrumentProperties,
}

/// Everything a run needs, validated.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub data: DataSettings,
    pub strategy: Strategy,
    pub options: OptimizerOptions,
    pub time_limit: Option<Duration>,
}

pub fn load_run_config(config: &dyn ConfigPort) -> Result<RunConfig, GeneratorError> {
    validate_config(config)?;
    Ok(RunConfig {
        data: build_data_settings(config)?,
        strategy: build_strategy(config)?,
        options: build_optimizer_options(config),
        time_limit: time_limit(config),
    })
}

pub fn build_data_settings(config: &dyn ConfigPort) -> Result<DataSettings, GeneratorError> {
    let missing = |key: &str| GeneratorError::ConfigMissing {
        section: "data".to_string(),
        key: key.to_string(),
    };
    let dir = config.get_string("data", "dir").ok_or_else(|| missing("dir"))?;
    let symbol = config.get_string("data", "symbol").ok_or_else(|| missing("symbol"))?;
    let digits = u32::try_from(config.get_int("data", "digits", 5))
        .map_err(|_| invalid("data", "digits", "digits must be non-negative"))?;
    Ok(DataSettings {
        dir: PathBuf::from(dir.trim()),
        instrument: InstrumentProperties::new(symbol.trim(), digits),
    })
}

pub fn build_optimizer_options(config: &dyn ConfigPort) -> OptimizerOptions {
    let defaults = OptimizerOptions::default();
    let count = |key: &str, default: usize| {
        usize::try_from(config.get_int("optimizer", key, default as i64)).unwrap_or(default)
    };
    let flag = |key: &str, default: bool| config.get_bool("optimizer", key, default);

    OptimizerOptions {
        seed: u64::try_from(config.get_int("optimizer", "seed", 0)).unwrap_or(defaults.seed),
        rounds: count("rounds", defaults.rounds),
        is_better: flag("is_better", defaults.is_better),
        max_numeric_rounds: count("max_numeric_rounds", defaults.max_numeric_rounds),
        preserve_permanent_sl: flag("preserve_permanent_sl", false),
        preserve_permanent_tp: flag("preserve_permanent_tp", false),
        preserve_break_even: flag("preserve_break_even", false),
        preserve_same_dir_action: flag("preserve_same_dir_action", false),
        preserve_opp_dir_action: flag("preserve_opp_dir_action", false),
        use_default_indicator_values: flag("use_default_indicator_values", false),
    }
}

/// `None` when unset or zero.
pub fn time_limit(config: &dyn ConfigPort) -> Option<Duration> {
    match config.get_int("optimizer", "time_limit_secs", 0) {
        secs if secs > 0 => Some(Duration::from_secs(secs as u64)),
        _ => None,
    }
}

pub fn build_strategy(config: &dyn ConfigPort) -> Result<Strategy, GeneratorError> {
    let entries = config.get_list("strategy", "slots", ',');
    if entries.is_empty() {
        return Err(GeneratorError::ConfigMissing {
            section: "strategy".to_string(),
            key: "slots".to_string(),
        });
    }

    let mut slots = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let (role, name) = parse_slot_entry(entry)?;
        let mut slot = IndicatorSlot::new(name, role)?;
        apply_slot_overrides(config, index, &mut slot)?;
        slots.push(slot);
    }

    let name = config
        .get_string("strategy", "name")
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "Unnamed strategy".to_string());
    let mut strategy = Strategy::from_slots(name.trim(), slots)?;

    if let Some(value) = config.get_string("strategy", "properties_status") {
        strategy.properties_status = SlotStatus::parse(&value).ok_or_else(|| {
            invalid("strategy", "properties_status", "expected open, locked or linked")
        })?;
    }
    if let Some(value) = config.get_string("strategy", "same_signal_action") {
        strategy.same_signal_action = SameDirSignalAction::parse(&value)
            .ok_or_else(|| invalid("strategy", "same_signal_action", "unknown action"))?;
    }
    if let Some(value) = config.get_string("strategy", "opposite_signal_action") {
        strategy.opposite_signal_action = OppositeDirSignalAction::parse(&value)
            .ok_or_else(|| invalid("strategy", "opposite_signal_action", "unknown action"))?;
    }

    strategy.permanent_sl = protection(config, "permanent_sl", strategy.permanent_sl)?;
    strategy.permanent_tp = protection(config, "permanent_tp", strategy.permanent_tp)?;
    strategy.break_even = protection(config, "break_even", strategy.break_even)?;

    tracing::debug!(
        strategy = %strategy.name,
        slots = strategy.slots.len(),
        "strategy built from config"
    );
    Ok(strategy)
}

fn protection(
    config: &dyn ConfigPort,
    key: &str,
    fallback: Protection,
) -> Result<Protection, GeneratorError> {
    match config.get_int("strategy", key, 0) {
        0 => Ok(fallback),
        d if d > 0 => i32::try_from(d)
            .map(Protection::enabled)
            .map_err(|_| invalid("strategy", key, "distance is too large")),
        _ => Err(invalid("strategy", key, &format!("{key} must be non-negative"))),
    }
}

/// Applies `[slotN]` overrides: `status`, `logic`, `listK`, `numK`, `checkK`.
fn apply_slot_overrides(
    config: &dyn ConfigPort,
    index: usize,
    slot: &mut IndicatorSlot,
) -> Result<(), GeneratorError> {
    let section = format!("slot{index}");
    let section = section.as_str();

    if let Some(value) = config.get_string(section, "status") {
        slot.status = SlotStatus::parse(&value)
            .ok_or_else(|| invalid(section, "status", "expected open, locked or linked"))?;
    }

    if let Some(value) = config.get_string(section, "logic") {
        select_list(slot, section, "logic", 0, &value)?;
    }
    for k in 1..LIST_PARAMS {
        let key = format!("list{k}");
        if let Some(value) = config.get_string(section, &key) {
            select_list(slot, section, &key, k, &value)?;
        }
    }

    for k in 0..NUMERIC_PARAMS {
        let key = format!("num{k}");
        let Some(raw) = config.get_string(section, &key) else {
            continue;
        };
        let value: f64 = raw
            .trim()
            .parse()
            .map_err(|_| invalid(section, &key, &format!("'{}' is not a number", raw.trim())))?;
        let param = &mut slot.param.num[k];
        if !param.enabled {
            return Err(invalid(section, &key, "parameter is not used by this indicator"));
        }
        if value < param.min || value > param.max {
            tracing::warn!(
                slot = index,
                param = %param.caption,
                value,
                min = param.min,
                max = param.max,
                "value outside the parameter range"
            );
        }
        param.value = value;
    }

    for k in 0..CHECK_PARAMS {
        let key = format!("check{k}");
        if config.get_string(section, &key).is_none() {
            continue;
        }
        let param = &mut slot.param.check[k];
        if !param.enabled {
            return Err(invalid(section, &key, "parameter is not used by this indicator"));
        }
        param.checked = config.get_bool(section, &key, param.checked);
    }
    Ok(())
}

fn select_list(
    slot: &mut IndicatorSlot,
    section: &str,
    key: &str,
    list: usize,
    raw: &str,
) -> Result<(), GeneratorError> {
    let index: usize = raw
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, &format!("'{}' is not an index", raw.trim())))?;
    let param = &mut slot.param.list[list];
    if !param.enabled || !param.select(index) {
        return Err(invalid(
            section,
            key,
            &format!("index {index} is not one of the {} choices", param.items.len()),
        ));
    }
    Ok(())
}
