//! Price-anchor indicators: Bar Opening, Bar Closing and Previous Bar Opening.
//!
//! These supply the entry and exit prices of a strategy. Previous Bar
//! Opening also works as a filter comparing the bar open, bar close or the
//! position price with the previous bar's open.

use crate::domain::dataset::price_series;
use crate::domain::indicator::logic::{self, SignalLogic};
use crate::domain::indicator::{
    filter_components, not_defined_choice, ComponentRole, Description, Indicator,
    IndicatorComponent, PriceDependence,
};
use crate::domain::ohlcv::BasePrice;
use crate::domain::param::{ExecutionTime, IndicatorCategory, IndicatorParam, ListParam, SlotRole};
use crate::ports::dataset_port::PriceDataset;

pub const BAR_OPENING: &str = "Bar Opening";
pub const BAR_CLOSING: &str = "Bar Closing";
pub const PREVIOUS_BAR_OPENING: &str = "Previous Bar Opening";

const LOGIC_TOOLTIP: &str = "Logic of application of the indicator.";

fn base_price_list(item: &str) -> ListParam {
    ListParam::new("Base price", vec![item.to_string()], 0, "Used price from the indicator.")
}

#[derive(Debug, Clone)]
pub struct BarOpening {
    param: IndicatorParam,
}

impl BarOpening {
    pub fn new() -> Self {
        let mut ind = Self {
            param: IndicatorParam::new(BAR_OPENING),
        };
        ind.initialize(SlotRole::EntryPoint);
        ind
    }
}

impl Default for BarOpening {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for BarOpening {
    fn possible_slots(&self) -> &'static [SlotRole] {
        &[SlotRole::EntryPoint]
    }

    fn param(&self) -> &IndicatorParam {
        &self.param
    }

    fn param_mut(&mut self) -> &mut IndicatorParam {
        &mut self.param
    }

    fn initialize(&mut self, role: SlotRole) {
        let mut p = IndicatorParam::new(BAR_OPENING);
        p.slot_role = role;
        p.category = IndicatorCategory::Additional;
        p.execution_time = ExecutionTime::AtBarOpening;
        let choices = if self.supports(role) {
            vec![(
                SignalLogic::AtPrice,
                "Enter the market at the beginning of the bar".to_string(),
            )]
        } else {
            not_defined_choice()
        };
        p.set_logic(&choices, LOGIC_TOOLTIP);
        p.list[1] = base_price_list("Open");
        self.param = p;
    }

    fn calculate(&self, data: &dyn PriceDataset) -> Vec<IndicatorComponent> {
        vec![IndicatorComponent::price(
            BAR_OPENING,
            ComponentRole::OpenPrice,
            0,
            price_series(data, BasePrice::Open),
        )]
    }

    fn describe(&self) -> Description {
        let text = "at the beginning of the bar".to_string();
        Description {
            long: text.clone(),
            short: text,
        }
    }

    fn label(&self) -> String {
        BAR_OPENING.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct BarClosing {
    param: IndicatorParam,
}

impl BarClosing {
    pub fn new() -> Self {
        let mut ind = Self {
            param: IndicatorParam::new(BAR_CLOSING),
        };
        ind.initialize(SlotRole::ExitPoint);
        ind
    }
}

impl Default for BarClosing {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for BarClosing {
    fn possible_slots(&self) -> &'static [SlotRole] {
        &[SlotRole::ExitPoint]
    }

    fn param(&self) -> &IndicatorParam {
        &self.param
    }

    fn param_mut(&mut self) -> &mut IndicatorParam {
        &mut self.param
    }

    fn initialize(&mut self, role: SlotRole) {
        let mut p = IndicatorParam::new(BAR_CLOSING);
        p.slot_role = role;
        p.category = IndicatorCategory::Additional;
        p.execution_time = ExecutionTime::AtBarClosing;
        let choices = if self.supports(role) {
            vec![(SignalLogic::AtPrice, "Exit the market at the end of the bar".to_string())]
        } else {
            not_defined_choice()
        };
        p.set_logic(&choices, LOGIC_TOOLTIP);
        p.list[1] = base_price_list("Close");
        self.param = p;
    }

    fn calculate(&self, data: &dyn PriceDataset) -> Vec<IndicatorComponent> {
        vec![IndicatorComponent::price(
            BAR_CLOSING,
            ComponentRole::ClosePrice,
            0,
            price_series(data, BasePrice::Close),
        )]
    }

    fn describe(&self) -> Description {
        let text = "at the end of the bar".to_string();
        Description {
            long: text.clone(),
            short: text,
        }
    }

    fn label(&self) -> String {
        BAR_CLOSING.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct PreviousBarOpening {
    param: IndicatorParam,
}

impl PreviousBarOpening {
    pub fn new() -> Self {
        let mut ind = Self {
            param: IndicatorParam::new(PREVIOUS_BAR_OPENING),
        };
        ind.initialize(SlotRole::EntryPoint);
        ind
    }
}

impl Default for PreviousBarOpening {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for PreviousBarOpening {
    fn possible_slots(&self) -> &'static [SlotRole] {
        &[
            SlotRole::EntryPoint,
            SlotRole::EntryFilter,
            SlotRole::ExitPoint,
            SlotRole::ExitFilter,
        ]
    }

    fn param(&self) -> &IndicatorParam {
        &self.param
    }

    fn param_mut(&mut self) -> &mut IndicatorParam {
        &mut self.param
    }

    fn initialize(&mut self, role: SlotRole) {
        let mut p = IndicatorParam::new(PREVIOUS_BAR_OPENING);
        p.slot_role = role;
        p.category = IndicatorCategory::Additional;

        let item = |tag: SignalLogic, text: &str| (tag, text.to_string());
        let choices = match role {
            SlotRole::EntryPoint => vec![item(
                SignalLogic::AtPrice,
                "Enter the market at the previous Bar Opening",
            )],
            SlotRole::EntryFilter => vec![
                item(SignalLogic::BarOpensAbove, "The bar opens above the previous Bar Opening"),
                item(SignalLogic::BarOpensBelow, "The bar opens below the previous Bar Opening"),
                item(
                    SignalLogic::PositionOpensAbove,
                    "The position opens above the previous Bar Opening",
                ),
                item(
                    SignalLogic::PositionOpensBelow,
                    "The position opens below the previous Bar Opening",
                ),
            ],
            SlotRole::ExitPoint => vec![item(
                SignalLogic::AtPrice,
                "Exit the market at the previous Bar Opening",
            )],
            SlotRole::ExitFilter => vec![
                item(SignalLogic::BarClosesAbove, "The bar closes above the previous Bar Opening"),
                item(SignalLogic::BarClosesBelow, "The bar closes below the previous Bar Opening"),
            ],
            SlotRole::NotDefined => not_defined_choice(),
        };
        p.set_logic(&choices, LOGIC_TOOLTIP);
        p.list[1] = base_price_list(PREVIOUS_BAR_OPENING);
        self.param = p;
    }

    fn calculate(&self, data: &dyn PriceDataset) -> Vec<IndicatorComponent> {
        const FIRST_BAR: usize = 1;
        let n = data.bars();
        let mut previous_open = vec![0.0; n];
        for bar in FIRST_BAR..n {
            previous_open[bar] = data.open(bar - 1);
        }

        let role = self.param.slot_role;
        let mut value = IndicatorComponent::price(
            PREVIOUS_BAR_OPENING,
            ComponentRole::IndicatorValue,
            FIRST_BAR,
            previous_open,
        );
        match role {
            SlotRole::EntryPoint => {
                value.role = ComponentRole::OpenPrice;
                return vec![value];
            }
            SlotRole::ExitPoint => {
                value.role = ComponentRole::ClosePrice;
                return vec![value];
            }
            SlotRole::NotDefined => return vec![value],
            SlotRole::EntryFilter | SlotRole::ExitFilter => {}
        }

        let mut long = vec![false; n];
        let mut short = vec![false; n];
        let logic = self.param.selected_logic();
        match logic {
            SignalLogic::BarOpensAbove => logic::bar_opens_above(
                &price_series(data, BasePrice::Open),
                &value.values,
                FIRST_BAR,
                &mut long,
                &mut short,
            ),
            SignalLogic::BarOpensBelow => logic::bar_opens_below(
                &price_series(data, BasePrice::Open),
                &value.values,
                FIRST_BAR,
                &mut long,
                &mut short,
            ),
            SignalLogic::BarClosesAbove => logic::bar_closes_above(
                &price_series(data, BasePrice::Close),
                &value.values,
                FIRST_BAR,
                &mut long,
                &mut short,
            ),
            SignalLogic::BarClosesBelow => logic::bar_closes_below(
                &price_series(data, BasePrice::Close),
                &value.values,
                FIRST_BAR,
                &mut long,
                &mut short,
            ),
            SignalLogic::PositionOpensAbove => {
                value.price_dependence = PriceDependence::BuyHigherSellLower;
            }
            SignalLogic::PositionOpensBelow => {
                value.price_dependence = PriceDependence::BuyLowerSellHigher;
            }
            _ => {}
        }

        let mut permissions = filter_components(role, FIRST_BAR, &long, &short);
        if value.price_dependence != PriceDependence::None {
            permissions.iter_mut().for_each(|c| c.role = ComponentRole::Other);
        }

        let mut components = vec![value];
        components.extend(permissions);
        components
    }

    fn describe(&self) -> Description {
        const REF: &str = "the opening price of the previous bar";
        let pair = |long: &str, short: &str| Description {
            long: format!("{long} {REF}"),
            short: format!("{short} {REF}"),
        };
        match self.param.selected_logic() {
            SignalLogic::AtPrice => pair("at", "at"),
            SignalLogic::PositionOpensAbove => {
                pair("the position opens above", "the position opens below")
            }
            SignalLogic::PositionOpensBelow => {
                pair("the position opens below", "the position opens above")
            }
            SignalLogic::BarOpensAbove => pair("the bar opens above", "the bar opens below"),
            SignalLogic::BarOpensBelow => pair("the bar opens below", "the bar opens above"),
            SignalLogic::BarClosesAbove => pair("the bar closes above", "the bar closes below"),
            SignalLogic::BarClosesBelow => pair("the bar closes below", "the bar closes above"),
            _ => Description::default(),
        }
    }

    fn label(&self) -> String {
        PREVIOUS_BAR_OPENING.to_string()
    }
}
