//! Indicator contract and shared component types.
//!
//! An indicator owns its [`IndicatorParam`] and turns a price dataset into
//! components: value series plus per-bar permission arrays. Indicators hold
//! no state between `calculate` calls, so one instance can be rebuilt from
//! a parameter snapshot at any time (see [`registry::restore`]).

pub mod atr;
pub mod bar_price;
pub mod cci;
pub mod logic;
pub mod ma_oscillator;
pub mod moving_average;
pub mod registry;
pub mod rsi;

use crate::domain::param::{IndicatorParam, SlotRole};
use crate::ports::dataset_port::PriceDataset;
use logic::SignalLogic;
use std::fmt;

pub const NOT_DEFINED: &str = "Not Defined";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentRole {
    IndicatorValue,
    OpenPrice,
    ClosePrice,
    AllowOpenLong,
    AllowOpenShort,
    ForceCloseLong,
    ForceCloseShort,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartHint {
    NoChart,
    Line,
    Histogram,
}

/// How a filter relates the position's entry price to the component value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceDependence {
    None,
    /// Longs open above the value, shorts below.
    BuyHigherSellLower,
    /// Longs open below the value, shorts above.
    BuyLowerSellHigher,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorComponent {
    pub name: String,
    pub role: ComponentRole,
    pub chart: ChartHint,
    /// Values before this bar are warm-up and carry no meaning.
    pub first_bar: usize,
    pub values: Vec<f64>,
    pub price_dependence: PriceDependence,
}

impl IndicatorComponent {
    pub fn series(name: &str, chart: ChartHint, first_bar: usize, values: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            role: ComponentRole::IndicatorValue,
            chart,
            first_bar,
            values,
            price_dependence: PriceDependence::None,
        }
    }

    pub fn price(name: &str, role: ComponentRole, first_bar: usize, values: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            role,
            chart: ChartHint::NoChart,
            first_bar,
            values,
            price_dependence: PriceDependence::None,
        }
    }

    /// A permission array stored as 1.0 / 0.0.
    pub fn permission(name: &str, role: ComponentRole, first_bar: usize, flags: &[bool]) -> Self {
        Self {
            name: name.to_string(),
            role,
            chart: ChartHint::NoChart,
            first_bar,
            values: flags.iter().map(|&f| if f { 1.0 } else { 0.0 }).collect(),
            price_dependence: PriceDependence::None,
        }
    }

    pub fn allows(&self, bar: usize) -> bool {
        self.values.get(bar).is_some_and(|v| *v > 0.5)
    }

    pub fn is_permission(&self) -> bool {
        matches!(
            self.role,
            ComponentRole::AllowOpenLong
                | ComponentRole::AllowOpenShort
                | ComponentRole::ForceCloseLong
                | ComponentRole::ForceCloseShort
        )
    }
}

/// Builds the long/short permission components for a filter slot.
/// Other roles get no permission components.
pub fn filter_components(
    role: SlotRole,
    first_bar: usize,
    long: &[bool],
    short: &[bool],
) -> Vec<IndicatorComponent> {
    match role {
        SlotRole::EntryFilter => vec![
            IndicatorComponent::permission(
                "Is long entry allowed",
                ComponentRole::AllowOpenLong,
                first_bar,
                long,
            ),
            IndicatorComponent::permission(
                "Is short entry allowed",
                ComponentRole::AllowOpenShort,
                first_bar,
                short,
            ),
        ],
        SlotRole::ExitFilter => vec![
            IndicatorComponent::permission(
                "Close out long position",
                ComponentRole::ForceCloseLong,
                first_bar,
                long,
            ),
            IndicatorComponent::permission(
                "Close out short position",
                ComponentRole::ForceCloseShort,
                first_bar,
                short,
            ),
        ],
        _ => Vec::new(),
    }
}

/// Role-specific natural-language text for the long and short side.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Description {
    pub long: String,
    pub short: String,
}

pub trait Indicator: Send + Sync {
    fn name(&self) -> &str {
        &self.param().indicator_name
    }

    fn possible_slots(&self) -> &'static [SlotRole];

    fn param(&self) -> &IndicatorParam;

    fn param_mut(&mut self) -> &mut IndicatorParam;

    /// Resets the parameters to the defaults for `role`.
    fn initialize(&mut self, role: SlotRole);

    fn calculate(&self, data: &dyn PriceDataset) -> Vec<IndicatorComponent>;

    fn describe(&self) -> Description;

    fn label(&self) -> String;

    fn supports(&self, role: SlotRole) -> bool {
        self.possible_slots().contains(&role)
    }
}

impl fmt::Display for dyn Indicator + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

pub(crate) const FILTER_SLOTS: &[SlotRole] = &[SlotRole::EntryFilter, SlotRole::ExitFilter];

/// The single "Not Defined" choice installed for unsupported roles.
pub(crate) fn not_defined_choice() -> Vec<(SignalLogic, String)> {
    vec![(SignalLogic::NotDefined, NOT_DEFINED.to_string())]
}

/// The eight oscillator logic choices. `line` names the comparison line,
/// e.g. "the Level line" or "the zero line".
pub(crate) fn oscillator_choices(subject: &str, line: &str) -> Vec<(SignalLogic, String)> {
    vec![
        (SignalLogic::Rises, format!("{subject} rises")),
        (SignalLogic::Falls, format!("{subject} falls")),
        (SignalLogic::HigherThanLevel, format!("{subject} is higher than {line}")),
        (SignalLogic::LowerThanLevel, format!("{subject} is lower than {line}")),
        (SignalLogic::CrossesLevelUpward, format!("{subject} crosses {line} upward")),
        (SignalLogic::CrossesLevelDownward, format!("{subject} crosses {line} downward")),
        (
            SignalLogic::ChangesDirectionUpward,
            format!("{subject} changes its direction upward"),
        ),
        (
            SignalLogic::ChangesDirectionDownward,
            format!("{subject} changes its direction downward"),
        ),
    ]
}

fn opposite(logic: SignalLogic) -> SignalLogic {
    match logic {
        SignalLogic::Rises => SignalLogic::Falls,
        SignalLogic::Falls => SignalLogic::Rises,
        SignalLogic::HigherThanLevel => SignalLogic::LowerThanLevel,
        SignalLogic::LowerThanLevel => SignalLogic::HigherThanLevel,
        SignalLogic::CrossesLevelUpward => SignalLogic::CrossesLevelDownward,
        SignalLogic::CrossesLevelDownward => SignalLogic::CrossesLevelUpward,
        SignalLogic::ChangesDirectionUpward => SignalLogic::ChangesDirectionDownward,
        SignalLogic::ChangesDirectionDownward => SignalLogic::ChangesDirectionUpward,
        SignalLogic::BarOpensAbove => SignalLogic::BarOpensBelow,
        SignalLogic::BarOpensBelow => SignalLogic::BarOpensAbove,
        SignalLogic::BarClosesAbove => SignalLogic::BarClosesBelow,
        SignalLogic::BarClosesBelow => SignalLogic::BarClosesAbove,
        SignalLogic::PositionOpensAbove => SignalLogic::PositionOpensBelow,
        SignalLogic::PositionOpensBelow => SignalLogic::PositionOpensAbove,
        other => other,
    }
}

fn oscillator_phrase(logic: SignalLogic, line: &str) -> String {
    match logic {
        SignalLogic::Rises => "rises".to_string(),
        SignalLogic::Falls => "falls".to_string(),
        SignalLogic::HigherThanLevel => format!("is higher than {line}"),
        SignalLogic::LowerThanLevel => format!("is lower than {line}"),
        SignalLogic::CrossesLevelUpward => format!("crosses {line} upward"),
        SignalLogic::CrossesLevelDownward => format!("crosses {line} downward"),
        SignalLogic::ChangesDirectionUpward => "changes its direction upward".to_string(),
        SignalLogic::ChangesDirectionDownward => "changes its direction downward".to_string(),
        _ => String::new(),
    }
}

/// Oscillator filter text. With `mirrored`, the short side reads the
/// opposite logic against `line_short`; otherwise both sides read the same.
pub(crate) fn describe_oscillator(
    subject: &str,
    logic: SignalLogic,
    line_long: &str,
    line_short: &str,
    mirrored: bool,
) -> Description {
    if logic == SignalLogic::NotDefined {
        return Description::default();
    }
    let long = format!("{subject} {}", oscillator_phrase(logic, line_long));
    let short = if mirrored {
        format!("{subject} {}", oscillator_phrase(opposite(logic), line_short))
    } else {
        long.clone()
    };
    Description { long, short }
}

/// `NAME (a, b, c)` or `NAME* (a, b, c)` when the previous bar value is used.
pub(crate) fn format_label(param: &IndicatorParam, parts: &[String]) -> String {
    let marker = if param.check[0].checked { "* (" } else { " (" };
    format!("{}{}{})", param.indicator_name, marker, parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_component_stores_flags() {
        let comp =
            IndicatorComponent::permission("x", ComponentRole::AllowOpenLong, 1, &[false, true]);
        assert_eq!(comp.values, vec![0.0, 1.0]);
        assert!(!comp.allows(0));
        assert!(comp.allows(1));
        assert!(!comp.allows(7));
        assert!(comp.is_permission());
    }

    #[test]
    fn filter_components_by_role() {
        let entry = filter_components(SlotRole::EntryFilter, 0, &[true], &[false]);
        assert_eq!(entry[0].role, ComponentRole::AllowOpenLong);
        assert_eq!(entry[1].name, "Is short entry allowed");

        let exit = filter_components(SlotRole::ExitFilter, 0, &[true], &[false]);
        assert_eq!(exit[0].role, ComponentRole::ForceCloseLong);
        assert_eq!(exit[1].name, "Close out short position");

        assert!(filter_components(SlotRole::EntryPoint, 0, &[true], &[true]).is_empty());
    }

    #[test]
    fn mirrored_description() {
        let d = describe_oscillator(
            "RSI (Smoothed, Close, 14)",
            SignalLogic::CrossesLevelUpward,
            "the Level 30",
            "the Level 70",
            true,
        );
        assert_eq!(d.long, "RSI (Smoothed, Close, 14) crosses the Level 30 upward");
        assert_eq!(d.short, "RSI (Smoothed, Close, 14) crosses the Level 70 downward");
    }

    #[test]
    fn unmirrored_description() {
        let d = describe_oscillator(
            "ATR",
            SignalLogic::Rises,
            "the zero line",
            "the zero line",
            false,
        );
        assert_eq!(d.long, "ATR rises");
        assert_eq!(d.short, "ATR rises");
    }

    #[test]
    fn oscillator_choices_wording() {
        let choices = oscillator_choices("RSI", "the Level line");
        assert_eq!(choices.len(), 8);
        assert_eq!(choices[2].1, "RSI is higher than the Level line");
        assert_eq!(choices[7].0, SignalLogic::ChangesDirectionDownward);
    }

    #[test]
    fn label_marks_previous_bar() {
        let mut param = IndicatorParam::new("RSI");
        param.check[0] = crate::domain::param::CheckParam::new("Use previous bar value", false, "");
        let parts = vec!["Smoothed".to_string(), "Close".to_string(), "14".to_string()];
        assert_eq!(format_label(&param, &parts), "RSI (Smoothed, Close, 14)");
        param.check[0].checked = true;
        assert_eq!(format_label(&param, &parts), "RSI* (Smoothed, Close, 14)");
    }
}
