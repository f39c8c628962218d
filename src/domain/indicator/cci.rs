//! Commodity Channel Index.
//!
//! CCI = (P - MA(P)) / (0.015 * mean deviation). A mean deviation below
//! EPSILON yields 0. Levels are mirrored around zero: `level` for longs,
//! `-level` for shorts.
//!
//! Warmup: first bar is period + 2.

use crate::domain::dataset::price_series;
use crate::domain::indicator::logic::{self, EPSILON};
use crate::domain::indicator::moving_average::{first_valid_bar, moving_average, MaMethod};
use crate::domain::indicator::{
    describe_oscillator, filter_components, format_label, not_defined_choice, oscillator_choices,
    ChartHint, Description, Indicator, IndicatorComponent, FILTER_SLOTS,
};
use crate::domain::ohlcv::BasePrice;
use crate::domain::param::{CheckParam, IndicatorParam, ListParam, NumericParam, SlotRole};
use crate::ports::dataset_port::PriceDataset;

pub const NAME: &str = "Commodity Channel Index";

pub fn cci_values(price: &[f64], period: usize, method: MaMethod) -> Vec<f64> {
    let n = price.len();
    let ma = moving_average(period, method, price, 0);
    let mut cci = vec![0.0; n];
    for bar in first_valid_bar(period, 0).max(period.saturating_add(2))..n {
        let window = &price[bar + 1 - period..=bar];
        let mean_dev = window.iter().map(|p| (p - ma[bar]).abs()).sum::<f64>() / period as f64;
        cci[bar] = if mean_dev < EPSILON {
            0.0
        } else {
            (price[bar] - ma[bar]) / (0.015 * mean_dev)
        };
    }
    cci
}

#[derive(Debug, Clone)]
pub struct CommodityChannelIndex {
    param: IndicatorParam,
}

impl CommodityChannelIndex {
    pub fn new() -> Self {
        let mut cci = Self {
            param: IndicatorParam::new(NAME),
        };
        cci.initialize(SlotRole::EntryFilter);
        cci
    }
}

impl Default for CommodityChannelIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for CommodityChannelIndex {
    fn possible_slots(&self) -> &'static [SlotRole] {
        FILTER_SLOTS
    }

    fn param(&self) -> &IndicatorParam {
        &self.param
    }

    fn param_mut(&mut self) -> &mut IndicatorParam {
        &mut self.param
    }

    fn initialize(&mut self, role: SlotRole) {
        let mut p = IndicatorParam::new(NAME);
        p.slot_role = role;

        let choices = if self.supports(role) {
            oscillator_choices("CCI", "the Level line")
        } else {
            not_defined_choice()
        };
        p.set_logic(&choices, "Logic of application of the indicator.");

        p.list[1] = ListParam::new(
            "Smoothing method",
            MaMethod::labels(),
            MaMethod::Simple.index(),
            "The Moving Average method used for smoothing the price.",
        );
        p.list[2] = ListParam::new(
            "Base price",
            BasePrice::labels(),
            BasePrice::Typical.index(),
            "The price CCI is based on.",
        );
        p.num[0] = NumericParam::new("Smoothing period", 14.0, 1.0, 200.0, "The period of CCI.");
        p.num[1] = NumericParam::new(
            "Level",
            100.0,
            0.0,
            1000.0,
            "A critical level (for the appropriate logic).",
        );
        p.check[0] = CheckParam::new(
            "Use previous bar value",
            false,
            "Use the indicator value from the previous bar.",
        );

        self.param = p;
    }

    fn calculate(&self, data: &dyn PriceDataset) -> Vec<IndicatorComponent> {
        let p = &self.param;
        let method = MaMethod::from_index(p.list[1].index);
        let base = BasePrice::from_index(p.list[2].index);
        let period = p.num[0].as_period();
        let level = p.num[1].value;
        let first_bar = period.saturating_add(2);

        let cci = cci_values(&price_series(data, base), period, method);

        let n = data.bars();
        let mut long = vec![false; n];
        let mut short = vec![false; n];
        logic::oscillator_logic(
            &cci,
            first_bar,
            p.previous_bar_lag(),
            level,
            -level,
            p.selected_logic(),
            &mut long,
            &mut short,
        );

        let mut components = vec![IndicatorComponent::series(
            "CCI",
            ChartHint::Line,
            first_bar,
            cci,
        )];
        components.extend(filter_components(p.slot_role, first_bar, &long, &short));
        components
    }

    fn describe(&self) -> Description {
        let level = &self.param.num[1];
        let line_long = format!("the Level {}", level.formatted_value());
        let line_short = format!("the Level {}", level.format_other(-level.value));
        describe_oscillator(
            &self.label(),
            self.param.selected_logic(),
            &line_long,
            &line_short,
            true,
        )
    }

    fn label(&self) -> String {
        let p = &self.param;
        format_label(
            p,
            &[
                p.list[1].text().to_string(),
                p.list[2].text().to_string(),
                p.num[0].formatted_value(),
            ],
        )
    }
}
