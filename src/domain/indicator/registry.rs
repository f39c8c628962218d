//! Name-keyed indicator catalog.

use crate::domain::error::GeneratorError;
use crate::domain::indicator::atr::{self, AverageTrueRange};
use crate::domain::indicator::bar_price::{
    BarClosing, BarOpening, PreviousBarOpening, BAR_CLOSING, BAR_OPENING, PREVIOUS_BAR_OPENING,
};
use crate::domain::indicator::cci::{self, CommodityChannelIndex};
use crate::domain::indicator::ma_oscillator::{
    MaOscillator, ATR_MA_OSCILLATOR, CCI_MA_OSCILLATOR, RSI_MA_OSCILLATOR,
};
use crate::domain::indicator::rsi::{self, Rsi};
use crate::domain::indicator::Indicator;
use crate::domain::param::{IndicatorParam, SlotRole};

const RSI_MA: &str = RSI_MA_OSCILLATOR.name;
const ATR_MA: &str = ATR_MA_OSCILLATOR.name;
const CCI_MA: &str = CCI_MA_OSCILLATOR.name;

const NAMES: [&str; 9] = [
    BAR_OPENING,
    BAR_CLOSING,
    PREVIOUS_BAR_OPENING,
    rsi::NAME,
    atr::NAME,
    cci::NAME,
    RSI_MA,
    ATR_MA,
    CCI_MA,
];

/// All registered indicator names in catalog order.
pub fn names() -> &'static [&'static str] {
    &NAMES
}

/// Names of indicators that can occupy `role`.
pub fn names_for(role: SlotRole) -> Vec<&'static str> {
    NAMES
        .iter()
        .copied()
        .filter(|name| construct(name).is_ok_and(|ind| ind.supports(role)))
        .collect()
}

/// A fresh indicator in its default state.
pub fn construct(name: &str) -> Result<Box<dyn Indicator>, GeneratorError> {
    let indicator: Box<dyn Indicator> = match name {
        BAR_OPENING => Box::new(BarOpening::new()),
        BAR_CLOSING => Box::new(BarClosing::new()),
        PREVIOUS_BAR_OPENING => Box::new(PreviousBarOpening::new()),
        rsi::NAME => Box::new(Rsi::new()),
        atr::NAME => Box::new(AverageTrueRange::new()),
        cci::NAME => Box::new(CommodityChannelIndex::new()),
        RSI_MA => Box::new(MaOscillator::new(&RSI_MA_OSCILLATOR)),
        ATR_MA => Box::new(MaOscillator::new(&ATR_MA_OSCILLATOR)),
        CCI_MA => Box::new(MaOscillator::new(&CCI_MA_OSCILLATOR)),
        _ => {
            return Err(GeneratorError::UnknownIndicator {
                name: name.to_string(),
            })
        }
    };
    Ok(indicator)
}

/// A fresh indicator initialized for `role`.
pub fn construct_for(name: &str, role: SlotRole) -> Result<Box<dyn Indicator>, GeneratorError> {
    let mut indicator = construct(name)?;
    if !indicator.supports(role) {
        return Err(GeneratorError::invalid_strategy(format!(
            "{name} cannot be used as {}",
            role.label()
        )));
    }
    indicator.initialize(role);
    Ok(indicator)
}

/// Rebuilds an indicator carrying a parameter snapshot.
pub fn restore(param: &IndicatorParam) -> Result<Box<dyn Indicator>, GeneratorError> {
    let mut indicator = construct(&param.indicator_name)?;
    *indicator.param_mut() = param.clone();
    Ok(indicator)
}

/// Default value of numeric parameter `index` for `name` in `role`.
pub fn default_numeric_value(
    name: &str,
    role: SlotRole,
    index: usize,
) -> Result<f64, GeneratorError> {
    let mut indicator = construct(name)?;
    indicator.initialize(role);
    indicator
        .param()
        .num
        .get(index)
        .map(|p| p.value)
        .ok_or_else(|| {
            GeneratorError::invalid_strategy(format!("{name} has no numeric parameter {index}"))
        })
}
