//! RSI (Relative Strength Index).
//!
//! Positive and negative price momentum are smoothed with the selected MA
//! method; RSI = 100 - 100 / (1 + pos / neg). A negative average below
//! EPSILON saturates to 100.
//!
//! Warmup: first bar is period + 2.

use crate::domain::dataset::price_series;
use crate::domain::indicator::logic::{self, EPSILON};
use crate::domain::indicator::moving_average::{moving_average, MaMethod};
use crate::domain::indicator::{
    describe_oscillator, filter_components, format_label, not_defined_choice, oscillator_choices,
    ChartHint, Description, Indicator, IndicatorComponent, FILTER_SLOTS,
};
use crate::domain::ohlcv::BasePrice;
use crate::domain::param::{CheckParam, IndicatorParam, ListParam, NumericParam, SlotRole};
use crate::ports::dataset_port::PriceDataset;

pub const NAME: &str = "RSI";

/// Computes the raw RSI line. Values before `period + 2` are 0.0.
pub fn rsi_values(price: &[f64], period: usize, method: MaMethod) -> Vec<f64> {
    let n = price.len();
    let mut pos = vec![0.0; n];
    let mut neg = vec![0.0; n];
    for bar in 1..n {
        let change = price[bar] - price[bar - 1];
        if change > 0.0 {
            pos[bar] = change;
        } else if change < 0.0 {
            neg[bar] = -change;
        }
    }

    let pos_ma = moving_average(period, method, &pos, 1);
    let neg_ma = moving_average(period, method, &neg, 1);

    let mut rsi = vec![0.0; n];
    for bar in period.saturating_add(2)..n {
        rsi[bar] = if neg_ma[bar].abs() < EPSILON {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + pos_ma[bar] / neg_ma[bar])
        };
    }
    rsi
}

#[derive(Debug, Clone)]
pub struct Rsi {
    param: IndicatorParam,
}

impl Rsi {
    pub fn new() -> Self {
        let mut rsi = Self {
            param: IndicatorParam::new(NAME),
        };
        rsi.initialize(SlotRole::EntryFilter);
        rsi
    }
}

impl Default for Rsi {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for Rsi {
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
            oscillator_choices(NAME, "the Level line")
        } else {
            not_defined_choice()
        };
        p.set_logic(&choices, "Logic of application of the indicator.");

        p.list[1] = ListParam::new(
            "Smoothing method",
            MaMethod::labels(),
            MaMethod::Smoothed.index(),
            "The Moving Average method used for smoothing RSI value.",
        );
        p.list[2] = ListParam::new(
            "Base price",
            BasePrice::labels(),
            BasePrice::Close.index(),
            "The price RSI is based on.",
        );
        p.num[0] = NumericParam::new(
            "Smoothing period",
            14.0,
            1.0,
            200.0,
            "The period of smoothing of RSI value.",
        );
        p.num[1] = NumericParam::new(
            "Level",
            30.0,
            0.0,
            100.0,
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

        let rsi = rsi_values(&price_series(data, base), period, method);

        let n = data.bars();
        let mut long = vec![false; n];
        let mut short = vec![false; n];
        logic::oscillator_logic(
            &rsi,
            first_bar,
            p.previous_bar_lag(),
            level,
            100.0 - level,
            p.selected_logic(),
            &mut long,
            &mut short,
        );

        let mut components = vec![IndicatorComponent::series(
            NAME,
            ChartHint::Line,
            first_bar,
            rsi,
        )];
        components.extend(filter_components(p.slot_role, first_bar, &long, &short));
        components
    }

    fn describe(&self) -> Description {
        let level = &self.param.num[1];
        let line_long = format!("the Level {}", level.formatted_value());
        let line_short = format!("the Level {}", level.format_other(100.0 - level.value));
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
