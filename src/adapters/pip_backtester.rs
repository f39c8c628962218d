//! Reference backtester scoring a strategy in net points.
//!
//! One position at a time. A position opens at the entry point price when
//! every entry filter agrees on exactly one direction (price-dependent
//! filters compare that entry price with their value), and closes at the
//! exit point price once every exit filter forces the close. Permanent
//! stop loss, take profit and break even are checked against each bar's
//! range, stop first.

use crate::domain::error::GeneratorError;
use crate::domain::indicator::{ComponentRole, IndicatorComponent, PriceDependence};
use crate::domain::param::SlotRole;
use crate::domain::strategy::{OppositeDirSignalAction, Strategy};
use crate::ports::backtest_port::Backtester;
use crate::ports::dataset_port::PriceDataset;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    fn opposite(self) -> Direction {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExitReason {
    ExitPoint,
    StopLoss,
    TakeProfit,
    BreakEven,
    OppositeSignal,
    EndOfData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub direction: Direction,
    pub entry_bar: usize,
    pub entry_price: f64,
    pub exit_bar: usize,
    pub exit_price: f64,
    pub reason: ExitReason,
    /// Profit in instrument points.
    pub points: f64,
}

#[derive(Debug, Clone)]
struct OpenPosition {
    direction: Direction,
    entry_bar: usize,
    entry_price: f64,
    /// Absolute stop price, 0.0 when none.
    stop: f64,
    target: f64,
    break_even_trigger: f64,
    break_even_armed: bool,
}

impl OpenPosition {
    fn should_stop(&self, high: f64, low: f64) -> bool {
        if self.stop == 0.0 {
            return false;
        }
        match self.direction {
            Direction::Long => low <= self.stop,
            Direction::Short => high >= self.stop,
        }
    }

    fn should_take_profit(&self, high: f64, low: f64) -> bool {
        if self.target == 0.0 {
            return false;
        }
        match self.direction {
            Direction::Long => high >= self.target,
            Direction::Short => low <= self.target,
        }
    }

    /// Moves the stop to the entry price once the trigger is touched.
    fn arm_break_even(&mut self, high: f64, low: f64) {
        if self.break_even_trigger == 0.0 || self.break_even_armed {
            return;
        }
        let reached = match self.direction {
            Direction::Long => high >= self.break_even_trigger,
            Direction::Short => low <= self.break_even_trigger,
        };
        if reached {
            self.break_even_armed = true;
            self.stop = self.entry_price;
        }
    }
}

/// The components the simulation reads, resolved once per evaluation.
struct Signals<'a> {
    entry_price: &'a IndicatorComponent,
    exit_price: &'a IndicatorComponent,
    entry_filters: Vec<&'a IndicatorComponent>,
    /// Entry filter values the entry price must sit above or below.
    price_gates: Vec<&'a IndicatorComponent>,
    exit_filters: Vec<&'a IndicatorComponent>,
}

impl<'a> Signals<'a> {
    fn resolve(strategy: &'a Strategy) -> Result<Self, GeneratorError> {
        let mut entry_price = None;
        let mut exit_price = None;
        let mut entry_filters = Vec::new();
        let mut price_gates = Vec::new();
        let mut exit_filters = Vec::new();

        for (index, slot) in strategy.slots.iter().enumerate() {
            if slot.components.is_empty() {
                return Err(GeneratorError::Evaluator {
                    reason: format!("slot {index} has no components"),
                });
            }
            for component in slot.components.iter() {
                match (slot.role, component.role) {
                    (SlotRole::EntryPoint, ComponentRole::OpenPrice) => {
                        entry_price = Some(component)
                    }
                    (SlotRole::ExitPoint, ComponentRole::ClosePrice) => {
                        exit_price = Some(component)
                    }
                    (
                        SlotRole::EntryFilter,
                        ComponentRole::AllowOpenLong | ComponentRole::AllowOpenShort,
                    ) => entry_filters.push(component),
                    (SlotRole::EntryFilter, ComponentRole::IndicatorValue)
                        if component.price_dependence != PriceDependence::None =>
                    {
                        price_gates.push(component)
                    }
                    (
                        SlotRole::ExitFilter,
                        ComponentRole::ForceCloseLong | ComponentRole::ForceCloseShort,
                    ) => exit_filters.push(component),
                    _ => {}
                }
            }
        }

        let missing = |what: &str| GeneratorError::Evaluator {
            reason: format!("strategy has no {what} price"),
        };
        Ok(Self {
            entry_price: entry_price.ok_or_else(|| missing("entry"))?,
            exit_price: exit_price.ok_or_else(|| missing("exit"))?,
            entry_filters,
            price_gates,
            exit_filters,
        })
    }

    fn price(component: &IndicatorComponent, bar: usize) -> Option<f64> {
        if bar < component.first_bar {
            return None;
        }
        component.values.get(bar).copied().filter(|p| p.is_finite() && *p > 0.0)
    }

    fn entry_allowed(&self, bar: usize, direction: Direction, price: f64) -> bool {
        let role = match direction {
            Direction::Long => ComponentRole::AllowOpenLong,
            Direction::Short => ComponentRole::AllowOpenShort,
        };
        self.entry_filters
            .iter()
            .filter(|c| c.role == role)
            .all(|c| c.allows(bar))
            && self
                .price_gates
                .iter()
                .all(|gate| Self::price_permits(gate, bar, direction, price))
    }

    fn price_permits(
        gate: &IndicatorComponent,
        bar: usize,
        direction: Direction,
        price: f64,
    ) -> bool {
        let Some(value) = Self::price(gate, bar) else {
            return false;
        };
        match (gate.price_dependence, direction) {
            (PriceDependence::None, _) => true,
            (PriceDependence::BuyHigherSellLower, Direction::Long)
            | (PriceDependence::BuyLowerSellHigher, Direction::Short) => price > value,
            (PriceDependence::BuyHigherSellLower, Direction::Short)
            | (PriceDependence::BuyLowerSellHigher, Direction::Long) => price < value,
        }
    }

    fn exit_forced(&self, bar: usize, direction: Direction) -> bool {
        let role = match direction {
            Direction::Long => ComponentRole::ForceCloseLong,
            Direction::Short => ComponentRole::ForceCloseShort,
        };
        self.exit_filters
            .iter()
            .filter(|c| c.role == role)
            .all(|c| c.allows(bar))
    }

    /// The single direction every entry filter agrees on for an entry at `price`.
    fn entry_signal(&self, bar: usize, price: f64) -> Option<Direction> {
        match (
            self.entry_allowed(bar, Direction::Long, price),
            self.entry_allowed(bar, Direction::Short, price),
        ) {
            (true, false) => Some(Direction::Long),
            (false, true) => Some(Direction::Short),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PipBacktester;

impl PipBacktester {
    pub fn new() -> Self {
        Self
    }

    /// Runs the simulation and returns every closed trade in order.
    pub fn simulate(
        &self,
        strategy: &Strategy,
        data: &dyn PriceDataset,
    ) -> Result<Vec<ClosedTrade>, GeneratorError> {
        let signals = Signals::resolve(strategy)?;
        let point = data.instrument().point();
        let mut trades = Vec::new();
        let mut position: Option<OpenPosition> = None;

        let close = |pos: OpenPosition, bar: usize, price: f64, reason: ExitReason| ClosedTrade {
            direction: pos.direction,
            entry_bar: pos.entry_bar,
            entry_price: pos.entry_price,
            exit_bar: bar,
            exit_price: price,
            reason,
            points: (price - pos.entry_price) * pos.direction.sign() / point,
        };
        let open = |direction: Direction, bar: usize, price: f64| {
            let offset = |distance: i32| distance as f64 * point;
            let sign = direction.sign();
            let sl = strategy.permanent_sl;
            let tp = strategy.permanent_tp;
            let be = strategy.break_even;
            OpenPosition {
                direction,
                entry_bar: bar,
                entry_price: price,
                stop: if sl.enabled {
                    price - sign * offset(sl.distance)
                } else {
                    0.0
                },
                target: if tp.enabled {
                    price + sign * offset(tp.distance)
                } else {
                    0.0
                },
                break_even_trigger: if be.enabled {
                    price + sign * offset(be.distance)
                } else {
                    0.0
                },
                break_even_armed: false,
            }
        };

        for bar in 0..data.bars() {
            let (high, low) = (data.high(bar), data.low(bar));

            if let Some(entry) = Signals::price(signals.entry_price, bar) {
                match (position.take(), signals.entry_signal(bar, entry)) {
                    (None, Some(direction)) => position = Some(open(direction, bar, entry)),
                    (Some(pos), Some(direction)) if direction == pos.direction.opposite() => {
                        match strategy.opposite_signal_action {
                            OppositeDirSignalAction::Close | OppositeDirSignalAction::Reduce => {
                                trades.push(close(pos, bar, entry, ExitReason::OppositeSignal));
                            }
                            OppositeDirSignalAction::Reverse => {
                                trades.push(close(pos, bar, entry, ExitReason::OppositeSignal));
                                position = Some(open(direction, bar, entry));
                            }
                            OppositeDirSignalAction::Nothing => position = Some(pos),
                        }
                    }
                    (held, _) => position = held,
                }
            }

            let Some(mut pos) = position.take() else {
                continue;
            };

            if pos.should_stop(high, low) {
                let reason = if pos.break_even_armed {
                    ExitReason::BreakEven
                } else {
                    ExitReason::StopLoss
                };
                let stop = pos.stop;
                trades.push(close(pos, bar, stop, reason));
                continue;
            }
            if pos.should_take_profit(high, low) {
                let target = pos.target;
                trades.push(close(pos, bar, target, ExitReason::TakeProfit));
                continue;
            }
            pos.arm_break_even(high, low);

            match Signals::price(signals.exit_price, bar) {
                Some(exit) if signals.exit_forced(bar, pos.direction) => {
                    trades.push(close(pos, bar, exit, ExitReason::ExitPoint));
                }
                _ => position = Some(pos),
            }
        }

        if let (Some(pos), Some(last)) = (position, data.bars().checked_sub(1)) {
            trades.push(close(pos, last, data.close(last), ExitReason::EndOfData));
        }
        Ok(trades)
    }
}

impl Backtester for PipBacktester {
    fn evaluate(
        &self,
        strategy: &Strategy,
        data: &dyn PriceDataset,
    ) -> Result<f64, GeneratorError> {
        let trades = self.simulate(strategy, data)?;
        let net: f64 = trades.iter().map(|t| t.points).sum();
        tracing::trace!(strategy = %strategy.name, trades = trades.len(), net, "evaluated");
        Ok(net)
    }
}
