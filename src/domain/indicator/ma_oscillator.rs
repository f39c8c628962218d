//! Moving-average oscillators: a base indicator minus its own signal line.
//!
//! One generic [`MaOscillator`] covers RSI, ATR and CCI MA Oscillator. The
//! base indicator is built through the registry, receives the shared
//! parameters (smoothing method, base price, period, previous-bar flag) and
//! is calculated first; its value line is then smoothed with the signal
//! method and subtracted.
//!
//! Warmup: base first bar + signal period.

use crate::domain::indicator::logic;
use crate::domain::indicator::moving_average::{moving_average, MaMethod};
use crate::domain::indicator::{
    atr, cci, describe_oscillator, filter_components, format_label, not_defined_choice,
    oscillator_choices, registry, rsi, ChartHint, ComponentRole, Description, Indicator,
    IndicatorComponent, FILTER_SLOTS,
};
use crate::domain::ohlcv::BasePrice;
use crate::domain::param::{
    CheckParam, IndicatorCategory, IndicatorParam, ListParam, NumericParam, SlotRole,
};
use crate::ports::dataset_port::PriceDataset;

/// Static description of one oscillator flavour.
#[derive(Debug)]
pub struct OscillatorKind {
    pub name: &'static str,
    /// Registry name of the base indicator.
    pub base: &'static str,
    /// Short name of the base used in captions, e.g. "RSI".
    pub short: &'static str,
    pub smoothing: MaMethod,
    pub signal: MaMethod,
    /// Default base price; `None` when the base reads no price.
    pub price: Option<BasePrice>,
    pub period: f64,
    pub signal_period: f64,
    pub component: &'static str,
    /// Short side reads the opposite logic.
    pub mirrored: bool,
    /// Descriptions start with "the ".
    pub article: bool,
}

pub const RSI_MA_OSCILLATOR: OscillatorKind = OscillatorKind {
    name: "RSI MA Oscillator",
    base: rsi::NAME,
    short: "RSI",
    smoothing: MaMethod::Smoothed,
    signal: MaMethod::Exponential,
    price: Some(BasePrice::Close),
    period: 10.0,
    signal_period: 14.0,
    component: "Oscillator",
    mirrored: true,
    article: true,
};

pub const ATR_MA_OSCILLATOR: OscillatorKind = OscillatorKind {
    name: "ATR MA Oscillator",
    base: atr::NAME,
    short: "ATR",
    smoothing: MaMethod::Simple,
    signal: MaMethod::Exponential,
    price: None,
    period: 10.0,
    signal_period: 14.0,
    component: "Histogram",
    mirrored: false,
    article: false,
};

pub const CCI_MA_OSCILLATOR: OscillatorKind = OscillatorKind {
    name: "CCI MA Oscillator",
    base: cci::NAME,
    short: "CCI",
    smoothing: MaMethod::Simple,
    signal: MaMethod::Exponential,
    price: Some(BasePrice::Typical),
    period: 14.0,
    signal_period: 13.0,
    component: "Histogram",
    mirrored: true,
    article: true,
};

#[derive(Debug, Clone)]
pub struct MaOscillator {
    kind: &'static OscillatorKind,
    param: IndicatorParam,
}

impl MaOscillator {
    pub fn new(kind: &'static OscillatorKind) -> Self {
        let mut osc = Self {
            kind,
            param: IndicatorParam::new(kind.name),
        };
        osc.initialize(SlotRole::EntryFilter);
        osc
    }

    /// Builds the base indicator with this oscillator's shared parameters.
    fn base_indicator(&self) -> Option<Box<dyn Indicator>> {
        let mut base = match registry::construct(self.kind.base) {
            Ok(base) => base,
            Err(err) => {
                tracing::warn!(
                    oscillator = self.kind.name,
                    error = %err,
                    "base indicator unavailable"
                );
                return None;
            }
        };
        base.initialize(self.param.slot_role);

        let p = &self.param;
        let bp = base.param_mut();
        bp.list[1].select(p.list[1].index);
        if self.kind.price.is_some() {
            bp.list[2].select(p.list[3].index);
        }
        bp.num[0].value = p.num[0].value;
        bp.check[0].checked = p.check[0].checked;
        Some(base)
    }
}

impl Indicator for MaOscillator {
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
        let kind = self.kind;
        let mut p = IndicatorParam::new(kind.name);
        p.slot_role = role;
        p.category = IndicatorCategory::IndicatorsMa;

        let choices = if self.supports(role) {
            oscillator_choices(kind.name, "the zero line")
        } else {
            not_defined_choice()
        };
        p.set_logic(&choices, "Logic of application of the oscillator.");

        p.list[1] = ListParam::new(
            "Smoothing method",
            MaMethod::labels(),
            kind.smoothing.index(),
            &format!("The Moving Average method used for smoothing the {} value.", kind.short),
        );
        p.list[2] = ListParam::new(
            "Signal line method",
            MaMethod::labels(),
            kind.signal.index(),
            "The Moving Average method used for smoothing the signal line.",
        );
        if let Some(price) = kind.price {
            p.list[3] = ListParam::new(
                "Base price",
                BasePrice::labels(),
                price.index(),
                &format!("The price {} is based on.", kind.short),
            );
        }
        p.num[0] = NumericParam::new(
            &format!("{} period", kind.short),
            kind.period,
            1.0,
            200.0,
            &format!("The period of {}.", kind.short),
        );
        p.num[1] = NumericParam::new(
            "Signal line period",
            kind.signal_period,
            1.0,
            200.0,
            "The period of signal line.",
        );
        p.check[0] = CheckParam::new(
            "Use previous bar value",
            false,
            "Use the indicator value from the previous bar.",
        );

        self.param = p;
    }

    fn calculate(&self, data: &dyn PriceDataset) -> Vec<IndicatorComponent> {
        let n = data.bars();
        let p = &self.param;
        let signal_method = MaMethod::from_index(p.list[2].index);
        let signal_period = p.num[1].as_period();

        let base_line = self.base_indicator().and_then(|base| {
            base.calculate(data)
                .into_iter()
                .find(|c| c.role == ComponentRole::IndicatorValue)
        });
        let (base_values, base_first) = match base_line {
            Some(comp) => (comp.values, comp.first_bar),
            None => (vec![0.0; n], n),
        };

        let first_bar = base_first.saturating_add(signal_period);
        let signal = moving_average(signal_period, signal_method, &base_values, base_first);
        let mut oscillator = vec![0.0; n];
        for bar in first_bar..n {
            oscillator[bar] = base_values[bar] - signal[bar];
        }

        let mut long = vec![false; n];
        let mut short = vec![false; n];
        let lag = p.previous_bar_lag();
        let selected = p.selected_logic();
        if self.kind.mirrored {
            logic::oscillator_logic(
                &oscillator,
                first_bar,
                lag,
                0.0,
                0.0,
                selected,
                &mut long,
                &mut short,
            );
        } else {
            logic::no_direction_oscillator_logic(
                &oscillator,
                first_bar,
                lag,
                0.0,
                selected,
                &mut long,
                &mut short,
            );
        }

        let mut components = vec![IndicatorComponent::series(
            self.kind.component,
            ChartHint::Histogram,
            first_bar,
            oscillator,
        )];
        components.extend(filter_components(p.slot_role, first_bar, &long, &short));
        components
    }

    fn describe(&self) -> Description {
        let subject = if self.kind.article {
            format!("the {}", self.label())
        } else {
            self.label()
        };
        describe_oscillator(
            &subject,
            self.param.selected_logic(),
            "the zero line",
            "the zero line",
            self.kind.mirrored,
        )
    }

    fn label(&self) -> String {
        let p = &self.param;
        let mut parts = vec![p.list[1].text().to_string(), p.list[2].text().to_string()];
        if self.kind.price.is_some() {
            parts.push(p.list[3].text().to_string());
        }
        parts.push(p.num[0].formatted_value());
        parts.push(p.num[1].formatted_value());
        format_label(p, &parts)
    }
}
