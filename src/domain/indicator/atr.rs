//! Average True Range.
//!
//! TR = max(H - L, |H - prevC|, |L - prevC|), smoothed with the selected MA
//! method. Volatility has no direction, so the long and short permissions
//! are identical.
//!
//! Warmup: first bar is period + 2.

use crate::domain::indicator::logic;
use crate::domain::indicator::moving_average::{moving_average, MaMethod};
use crate::domain::indicator::{
    describe_oscillator, filter_components, format_label, not_defined_choice, oscillator_choices,
    ChartHint, Description, Indicator, IndicatorComponent, FILTER_SLOTS,
};
use crate::domain::param::{CheckParam, IndicatorParam, ListParam, NumericParam, SlotRole};
use crate::ports::dataset_port::PriceDataset;

pub const NAME: &str = "Average True Range";

/// True range per bar; bar 0 has no previous close and stays 0.0.
pub fn true_range(data: &dyn PriceDataset) -> Vec<f64> {
    let mut tr = vec![0.0; data.bars()];
    for bar in 1..data.bars() {
        let prev_close = data.close(bar - 1);
        let hl = data.high(bar) - data.low(bar);
        let hc = (data.high(bar) - prev_close).abs();
        let lc = (data.low(bar) - prev_close).abs();
        tr[bar] = hl.max(hc).max(lc);
    }
    tr
}

#[derive(Debug, Clone)]
pub struct AverageTrueRange {
    param: IndicatorParam,
}

impl AverageTrueRange {
    pub fn new() -> Self {
        let mut atr = Self {
            param: IndicatorParam::new(NAME),
        };
        atr.initialize(SlotRole::EntryFilter);
        atr
    }
}

impl Default for AverageTrueRange {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for AverageTrueRange {
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
            oscillator_choices("ATR", "the Level line")
        } else {
            not_defined_choice()
        };
        p.set_logic(&choices, "Logic of application of the indicator.");

        p.list[1] = ListParam::new(
            "Smoothing method",
            MaMethod::labels(),
            MaMethod::Simple.index(),
            "The Moving Average method used for smoothing the True Range.",
        );
        p.num[0] = NumericParam::new("Smoothing period", 14.0, 1.0, 200.0, "The period of ATR.");
        p.num[1] = NumericParam::new(
            "Level",
            0.0,
            0.0,
            5.0,
            "A critical level (for the appropriate logic).",
        )
        .with_point(4);
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
        let period = p.num[0].as_period();
        let first_bar = period.saturating_add(2);

        let mut atr = moving_average(period, method, &true_range(data), 1);
        atr.iter_mut().take(first_bar).for_each(|v| *v = 0.0);

        let n = data.bars();
        let mut long = vec![false; n];
        let mut short = vec![false; n];
        logic::no_direction_oscillator_logic(
            &atr,
            first_bar,
            p.previous_bar_lag(),
            p.num[1].value,
            p.selected_logic(),
            &mut long,
            &mut short,
        );

        let mut components = vec![IndicatorComponent::series(
            "ATR",
            ChartHint::Line,
            first_bar,
            atr,
        )];
        components.extend(filter_components(p.slot_role, first_bar, &long, &short));
        components
    }

    fn describe(&self) -> Description {
        let line = format!("the Level {}", self.param.num[1].formatted_value());
        describe_oscillator(&self.label(), self.param.selected_logic(), &line, &line, false)
    }

    fn label(&self) -> String {
        let p = &self.param;
        format_label(p, &[p.list[1].text().to_string(), p.num[0].formatted_value()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::sample_dataset;
    use approx::assert_relative_eq;

    #[test]
    fn true_range_includes_gaps() {
        let data = sample_dataset(&[(10.0, 11.0, 9.0, 10.0), (14.0, 15.0, 13.0, 14.0)]);
        let tr = true_range(&data);
        assert_eq!(tr[0], 0.0);
        // |15 - 10| dominates H - L = 2
        assert_relative_eq!(tr[1], 5.0);
    }

    #[test]
    fn constant_range_gives_constant_atr() {
        let bars: Vec<_> = (0..30).map(|_| (10.0, 11.0, 9.0, 10.0)).collect();
        let data = sample_dataset(&bars);
        let comps = AverageTrueRange::new().calculate(&data);
        assert_eq!(comps[0].first_bar, 16);
        assert_eq!(comps[0].values[15], 0.0);
        for bar in 16..30 {
            assert_relative_eq!(comps[0].values[bar], 2.0);
        }
    }

    #[test]
    fn long_and_short_are_identical() {
        let bars: Vec<_> = (0..40)
            .map(|i| {
                let w = 1.0 + (i % 5) as f64;
                (10.0, 10.0 + w, 10.0 - w, 10.0)
            })
            .collect();
        let data = sample_dataset(&bars);
        let mut atr = AverageTrueRange::new();
        atr.param_mut().num[0].value = 3.0;
        let comps = atr.calculate(&data);
        assert_eq!(comps[1].values, comps[2].values);
        assert!(comps[1].values.iter().any(|v| *v > 0.5));
    }

    #[test]
    fn label_and_description() {
        let atr = AverageTrueRange::new();
        assert_eq!(atr.label(), "Average True Range (Simple, 14)");
        let d = atr.describe();
        assert_eq!(d.long, "Average True Range (Simple, 14) rises");
        assert_eq!(d.short, d.long);
    }
}
