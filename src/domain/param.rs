//! Indicator parameter model.
//!
//! Every indicator exposes the same fixed-shape parameter set: five choice
//! lists, six numeric values and two check boxes. The whole set is a plain
//! value type, so `clone()` is the deep copy the optimizer snapshots.
//!
//! Numeric assignments are not range-checked. `min ≤ value ≤ max` is the
//! intended invariant, but callers that need it must clamp themselves.

use crate::domain::indicator::logic::SignalLogic;
use std::fmt;

pub const LIST_PARAMS: usize = 5;
pub const NUMERIC_PARAMS: usize = 6;
pub const CHECK_PARAMS: usize = 2;

/// Position of a slot within a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotRole {
    EntryPoint,
    EntryFilter,
    ExitPoint,
    ExitFilter,
    NotDefined,
}

impl SlotRole {
    pub fn is_filter(self) -> bool {
        matches!(self, SlotRole::EntryFilter | SlotRole::ExitFilter)
    }

    pub fn label(self) -> &'static str {
        match self {
            SlotRole::EntryPoint => "entry_point",
            SlotRole::EntryFilter => "entry_filter",
            SlotRole::ExitPoint => "exit_point",
            SlotRole::ExitFilter => "exit_filter",
            SlotRole::NotDefined => "not_defined",
        }
    }

    pub fn parse(s: &str) -> Option<SlotRole> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "entry_point" => Some(SlotRole::EntryPoint),
            "entry_filter" => Some(SlotRole::EntryFilter),
            "exit_point" => Some(SlotRole::ExitPoint),
            "exit_filter" => Some(SlotRole::ExitFilter),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorCategory {
    Indicator,
    /// Built on a moving average of another indicator.
    IndicatorsMa,
    Additional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionTime {
    DuringTheBar,
    AtBarOpening,
    AtBarClosing,
}

/// Largest period `NumericParam::as_period` hands out.
pub const MAX_PERIOD: usize = u32::MAX as usize;

#[derive(Debug, Clone, PartialEq)]
pub struct NumericParam {
    pub caption: String,
    pub value: f64,
    pub min: f64,
    pub max: f64,
    /// Number of significant decimal digits.
    pub point: usize,
    pub enabled: bool,
    pub tooltip: String,
}

impl Default for NumericParam {
    fn default() -> Self {
        Self {
            caption: String::new(),
            value: 0.0,
            min: 0.0,
            max: 100.0,
            point: 0,
            enabled: false,
            tooltip: String::new(),
        }
    }
}

impl NumericParam {
    pub fn new(caption: &str, value: f64, min: f64, max: f64, tooltip: &str) -> Self {
        Self {
            caption: caption.to_string(),
            value,
            min,
            max,
            point: 0,
            enabled: true,
            tooltip: tooltip.to_string(),
        }
    }

    pub fn with_point(mut self, point: usize) -> Self {
        self.point = point;
        self
    }

    pub fn formatted_value(&self) -> String {
        self.format_other(self.value)
    }

    /// Formats `value` with this parameter's precision.
    pub fn format_other(&self, value: f64) -> String {
        format!("{:.*}", self.point, value)
    }

    /// Rounds `value` to this parameter's precision.
    pub fn round(&self, value: f64) -> f64 {
        let factor = 10f64.powi(self.point as i32);
        (value * factor).round() / factor
    }

    /// The value as a period or count, clamped to `1..=MAX_PERIOD`.
    pub fn as_period(&self) -> usize {
        if self.value.is_finite() && self.value >= 1.0 {
            (self.value as usize).min(MAX_PERIOD)
        } else {
            1
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListParam {
    pub caption: String,
    pub items: Vec<String>,
    pub index: usize,
    pub enabled: bool,
    pub tooltip: String,
}

impl ListParam {
    pub fn new(caption: &str, items: Vec<String>, index: usize, tooltip: &str) -> Self {
        let index = if index < items.len() { index } else { 0 };
        Self {
            caption: caption.to_string(),
            items,
            index,
            enabled: true,
            tooltip: tooltip.to_string(),
        }
    }

    /// Selected item label, empty when nothing is selectable.
    pub fn text(&self) -> &str {
        self.items.get(self.index).map(String::as_str).unwrap_or("")
    }

    /// Selects `index`; returns false and keeps the old selection when out of range.
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.items.len() {
            self.index = index;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CheckParam {
    pub caption: String,
    pub checked: bool,
    pub enabled: bool,
    pub tooltip: String,
}

impl CheckParam {
    pub fn new(caption: &str, checked: bool, tooltip: &str) -> Self {
        Self {
            caption: caption.to_string(),
            checked,
            enabled: true,
            tooltip: tooltip.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorParam {
    pub indicator_name: String,
    pub category: IndicatorCategory,
    pub slot_role: SlotRole,
    pub execution_time: ExecutionTime,
    /// Whether the indicator may run on a longer time frame.
    pub allow_ltf: bool,
    pub list: [ListParam; LIST_PARAMS],
    pub num: [NumericParam; NUMERIC_PARAMS],
    pub check: [CheckParam; CHECK_PARAMS],
    /// Logic tag for each item of `list[0]`.
    pub logic: Vec<SignalLogic>,
}

impl IndicatorParam {
    pub fn new(indicator_name: &str) -> Self {
        Self {
            indicator_name: indicator_name.to_string(),
            category: IndicatorCategory::Indicator,
            slot_role: SlotRole::NotDefined,
            execution_time: ExecutionTime::DuringTheBar,
            allow_ltf: true,
            list: Default::default(),
            num: Default::default(),
            check: Default::default(),
            logic: Vec::new(),
        }
    }

    /// Installs the logic choice list. Labels and tags are paired by position.
    pub fn set_logic(&mut self, choices: &[(SignalLogic, String)], tooltip: &str) {
        self.logic = choices.iter().map(|(tag, _)| *tag).collect();
        let items = choices.iter().map(|(_, label)| label.clone()).collect();
        self.list[0] = ListParam::new("Logic", items, 0, tooltip);
    }

    pub fn selected_logic(&self) -> SignalLogic {
        self.logic
            .get(self.list[0].index)
            .copied()
            .unwrap_or(SignalLogic::NotDefined)
    }

    /// Lag in bars requested by the "use previous bar value" check box.
    pub fn previous_bar_lag(&self) -> usize {
        if self.check[0].enabled && self.check[0].checked {
            1
        } else {
            0
        }
    }

    pub fn enabled_numeric(&self) -> impl Iterator<Item = usize> + '_ {
        self.num
            .iter()
            .enumerate()
            .filter(|(_, p)| p.enabled)
            .map(|(i, _)| i)
    }
}

impl fmt::Display for IndicatorParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for p in self.list.iter().filter(|p| p.enabled) {
            writeln!(f, "{}: {}", p.caption, p.text())?;
        }
        for p in self.num.iter().filter(|p| p.enabled) {
            writeln!(f, "{}: {}", p.caption, p.formatted_value())?;
        }
        for p in self.check.iter().filter(|p| p.enabled) {
            writeln!(f, "{}: {}", p.caption, if p.checked { "Yes" } else { "No" })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_param() -> IndicatorParam {
        let mut param = IndicatorParam::new("Sample");
        param.set_logic(
            &[
                (SignalLogic::Rises, "Sample rises".to_string()),
                (SignalLogic::HigherThanLevel, "Sample is higher than the Level line".to_string()),
            ],
            "Logic of application of the indicator.",
        );
        param.num[0] = NumericParam::new("Period", 14.0, 1.0, 200.0, "The period.");
        param.num[1] = NumericParam::new("Level", 0.25, 0.0, 1.0, "A level.").with_point(2);
        param.check[0] = CheckParam::new("Use previous bar value", true, "");
        param
    }

    #[test]
    fn numeric_formats_with_precision() {
        let p = NumericParam::new("Level", 30.0, 0.0, 100.0, "").with_point(2);
        assert_eq!(p.formatted_value(), "30.00");
        assert_eq!(p.format_other(70.0), "70.00");

        let q = NumericParam::new("Period", 14.0, 1.0, 200.0, "");
        assert_eq!(q.formatted_value(), "14");
    }

    #[test]
    fn numeric_out_of_range_is_kept() {
        let mut p = NumericParam::new("Period", 14.0, 1.0, 200.0, "");
        p.value = 500.0;
        assert_eq!(p.value, 500.0);
        assert_eq!(p.formatted_value(), "500");
    }

    #[test]
    fn numeric_round_and_period() {
        let p = NumericParam::new("Level", 0.0, 0.0, 1.0, "").with_point(2);
        assert!((p.round(0.256) - 0.26).abs() < 1e-12);

        let mut period = NumericParam::new("Period", 0.0, 1.0, 200.0, "");
        assert_eq!(period.as_period(), 1);
        period.value = 20.7;
        assert_eq!(period.as_period(), 20);
        period.value = 1e20;
        assert_eq!(period.as_period(), MAX_PERIOD);
    }

    #[test]
    fn list_select_respects_bounds() {
        let mut list = ListParam::new("Method", vec!["A".into(), "B".into()], 1, "");
        assert_eq!(list.text(), "B");
        assert!(!list.select(2));
        assert_eq!(list.index, 1);
        assert!(list.select(0));
        assert_eq!(list.text(), "A");
    }

    #[test]
    fn list_new_falls_back_to_first_item() {
        let list = ListParam::new("Method", vec!["A".into()], 4, "");
        assert_eq!(list.index, 0);
        assert_eq!(ListParam::default().text(), "");
    }

    #[test]
    fn clone_is_deep() {
        let original = sample_param();
        let mut copy = original.clone();
        copy.num[0].value = 50.0;
        copy.list[0].select(1);
        copy.check[0].checked = false;

        assert_eq!(original.num[0].value, 14.0);
        assert_eq!(original.list[0].index, 0);
        assert!(original.check[0].checked);
        assert_ne!(original, copy);
    }

    #[test]
    fn selected_logic_follows_list_index() {
        let mut param = sample_param();
        assert_eq!(param.selected_logic(), SignalLogic::Rises);
        param.list[0].select(1);
        assert_eq!(param.selected_logic(), SignalLogic::HigherThanLevel);
        param.list[0].index = 7;
        assert_eq!(param.selected_logic(), SignalLogic::NotDefined);
    }

    #[test]
    fn previous_bar_lag_reads_check_box() {
        let mut param = sample_param();
        assert_eq!(param.previous_bar_lag(), 1);
        param.check[0].checked = false;
        assert_eq!(param.previous_bar_lag(), 0);
    }

    #[test]
    fn display_lists_enabled_params() {
        let text = sample_param().to_string();
        assert_eq!(
            text,
            "Logic: Sample rises\nPeriod: 14\nLevel: 0.25\nUse previous bar value: Yes\n"
        );
    }

    #[test]
    fn slot_role_parse() {
        assert_eq!(SlotRole::parse("entry_point"), Some(SlotRole::EntryPoint));
        assert_eq!(SlotRole::parse("Exit-Filter"), Some(SlotRole::ExitFilter));
        assert_eq!(SlotRole::parse("bogus"), None);
        assert!(SlotRole::EntryFilter.is_filter());
        assert!(!SlotRole::ExitPoint.is_filter());
    }
}
