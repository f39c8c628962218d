//! Strategy composition: ordered indicator slots plus trade management.
//!
//! Slot order is fixed: one entry point, entry filters, one exit point,
//! exit filters. Slots keep only their parameter snapshot and the last
//! computed components, so cloning a `Strategy` is a deep copy of every
//! parameter and a cheap `Arc` share of the components.

use crate::domain::error::GeneratorError;
use crate::domain::indicator::{registry, Indicator, IndicatorComponent};
use crate::domain::param::{IndicatorParam, SlotRole};
use crate::ports::dataset_port::PriceDataset;
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SlotStatus {
    #[default]
    Open,
    /// Never mutated by the optimizer.
    Locked,
    /// Parameters may change but the slot is never removed.
    Linked,
}

impl SlotStatus {
    pub fn parse(s: &str) -> Option<SlotStatus> {
        match s.trim().to_lowercase().as_str() {
            "open" => Some(SlotStatus::Open),
            "locked" => Some(SlotStatus::Locked),
            "linked" => Some(SlotStatus::Linked),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SameDirSignalAction {
    #[default]
    Nothing,
    Winner,
    Add,
}

impl SameDirSignalAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "nothing" => Some(Self::Nothing),
            "winner" => Some(Self::Winner),
            "add" => Some(Self::Add),
            _ => None,
        }
    }
}

impl fmt::Display for SameDirSignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Nothing => "Nothing",
            Self::Winner => "Add to a winning position",
            Self::Add => "Add to the position",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OppositeDirSignalAction {
    #[default]
    Nothing,
    Reduce,
    Close,
    Reverse,
}

impl OppositeDirSignalAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "nothing" => Some(Self::Nothing),
            "reduce" => Some(Self::Reduce),
            "close" => Some(Self::Close),
            "reverse" => Some(Self::Reverse),
            _ => None,
        }
    }
}

impl fmt::Display for OppositeDirSignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Nothing => "Nothing",
            Self::Reduce => "Reduce the position",
            Self::Close => "Close the position",
            Self::Reverse => "Reverse the position",
        };
        f.write_str(text)
    }
}

/// A fixed-distance protective rule. Distance is in instrument points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Protection {
    pub enabled: bool,
    pub distance: i32,
}

impl Protection {
    pub fn enabled(distance: i32) -> Self {
        Self {
            enabled: true,
            distance,
        }
    }

    pub fn disabled(distance: i32) -> Self {
        Self {
            enabled: false,
            distance,
        }
    }
}

/// Selects one of the three permanent protections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtectionKind {
    StopLoss,
    TakeProfit,
    BreakEven,
}

impl ProtectionKind {
    pub const ALL: [ProtectionKind; 3] = [
        ProtectionKind::StopLoss,
        ProtectionKind::TakeProfit,
        ProtectionKind::BreakEven,
    ];

    pub fn caption(self) -> &'static str {
        match self {
            ProtectionKind::StopLoss => "Permanent Stop Loss",
            ProtectionKind::TakeProfit => "Permanent Take Profit",
            ProtectionKind::BreakEven => "Break Even",
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorSlot {
    pub role: SlotRole,
    pub status: SlotStatus,
    pub param: IndicatorParam,
    pub components: Arc<Vec<IndicatorComponent>>,
}

impl IndicatorSlot {
    /// A slot holding `name` initialized with its defaults for `role`.
    pub fn new(name: &str, role: SlotRole) -> Result<Self, GeneratorError> {
        let indicator = registry::construct_for(name, role)?;
        Ok(Self {
            role,
            status: SlotStatus::Open,
            param: indicator.param().clone(),
            components: Arc::new(Vec::new()),
        })
    }

    pub fn indicator(&self) -> Result<Box<dyn Indicator>, GeneratorError> {
        registry::restore(&self.param)
    }

    pub fn recalculate(&mut self, data: &dyn PriceDataset) -> Result<(), GeneratorError> {
        let indicator = self.indicator()?;
        self.components = Arc::new(indicator.calculate(data));
        Ok(())
    }

    pub fn is_filter(&self) -> bool {
        self.role.is_filter()
    }

    /// Whether the optimizer may remove this slot.
    pub fn is_removable(&self) -> bool {
        self.is_filter() && self.status == SlotStatus::Open
    }

    pub fn label(&self) -> String {
        self.indicator()
            .map(|ind| ind.label())
            .unwrap_or_else(|_| self.param.indicator_name.clone())
    }
}

#[derive(Debug, Clone)]
pub struct Strategy {
    pub name: String,
    pub slots: Vec<IndicatorSlot>,
    /// Governs whether SL/TP/break-even and signal actions may change.
    pub properties_status: SlotStatus,
    pub permanent_sl: Protection,
    pub permanent_tp: Protection,
    pub break_even: Protection,
    pub same_signal_action: SameDirSignalAction,
    pub opposite_signal_action: OppositeDirSignalAction,
}

impl Strategy {
    /// Builds a strategy with default trade management, rejecting slot
    /// sequences that break the entry/exit ordering.
    pub fn from_slots(name: &str, slots: Vec<IndicatorSlot>) -> Result<Self, GeneratorError> {
        let strategy = Self {
            name: name.to_string(),
            slots,
            properties_status: SlotStatus::Open,
            permanent_sl: Protection::disabled(1000),
            permanent_tp: Protection::disabled(1000),
            break_even: Protection::disabled(1000),
            same_signal_action: SameDirSignalAction::Nothing,
            opposite_signal_action: OppositeDirSignalAction::Nothing,
        };
        strategy.validate()?;
        Ok(strategy)
    }

    pub fn validate(&self) -> Result<(), GeneratorError> {
        let rank = |role: SlotRole| match role {
            SlotRole::EntryPoint => 0,
            SlotRole::EntryFilter => 1,
            SlotRole::ExitPoint => 2,
            SlotRole::ExitFilter => 3,
            SlotRole::NotDefined => 4,
        };

        if self.slots.first().map(|s| s.role) != Some(SlotRole::EntryPoint) {
            return Err(GeneratorError::invalid_strategy("first slot must be the entry point"));
        }
        let exit_points = self.slots.iter().filter(|s| s.role == SlotRole::ExitPoint).count();
        if exit_points != 1 {
            return Err(GeneratorError::invalid_strategy(format!(
                "expected exactly one exit point, found {exit_points}"
            )));
        }
        let entry_points = self.slots.iter().filter(|s| s.role == SlotRole::EntryPoint).count();
        if entry_points != 1 {
            return Err(GeneratorError::invalid_strategy(format!(
                "expected exactly one entry point, found {entry_points}"
            )));
        }
        for (i, pair) in self.slots.windows(2).enumerate() {
            if rank(pair[1].role) < rank(pair[0].role) {
                return Err(GeneratorError::invalid_strategy(format!(
                    "slot {} ({}) is out of order",
                    i + 1,
                    pair[1].role.label()
                )));
            }
        }
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.role == SlotRole::NotDefined {
                return Err(GeneratorError::invalid_strategy(format!("slot {i} has no role")));
            }
            if slot.param.slot_role != slot.role {
                return Err(GeneratorError::invalid_strategy(format!(
                    "slot {i} parameters were initialized for {}",
                    slot.param.slot_role.label()
                )));
            }
        }
        Ok(())
    }

    pub fn protection(&self, kind: ProtectionKind) -> Protection {
        match kind {
            ProtectionKind::StopLoss => self.permanent_sl,
            ProtectionKind::TakeProfit => self.permanent_tp,
            ProtectionKind::BreakEven => self.break_even,
        }
    }

    pub fn protection_mut(&mut self, kind: ProtectionKind) -> &mut Protection {
        match kind {
            ProtectionKind::StopLoss => &mut self.permanent_sl,
            ProtectionKind::TakeProfit => &mut self.permanent_tp,
            ProtectionKind::BreakEven => &mut self.break_even,
        }
    }

    pub fn filters(&self) -> impl Iterator<Item = (usize, &IndicatorSlot)> {
        self.slots.iter().enumerate().filter(|(_, s)| s.is_filter())
    }

    /// Removes a filter slot. Entry and exit points cannot be removed.
    pub fn remove_filter(&mut self, index: usize) -> Result<IndicatorSlot, GeneratorError> {
        match self.slots.get(index) {
            Some(slot) if slot.is_filter() => Ok(self.slots.remove(index)),
            Some(_) => Err(GeneratorError::invalid_strategy(format!(
                "slot {index} is not a filter"
            ))),
            None => Err(GeneratorError::invalid_strategy(format!(
                "slot {index} does not exist"
            ))),
        }
    }

    /// Recomputes every slot's components. Slots are independent, so they
    /// are calculated in parallel.
    pub fn recalculate(&mut self, data: &dyn PriceDataset) -> Result<(), GeneratorError> {
        self.slots
            .par_iter_mut()
            .try_for_each(|slot| slot.recalculate(data))
    }

    pub fn recalculate_slot(
        &mut self,
        index: usize,
        data: &dyn PriceDataset,
    ) -> Result<(), GeneratorError> {
        match self.slots.get_mut(index) {
            Some(slot) => slot.recalculate(data),
            None => Err(GeneratorError::invalid_strategy(format!(
                "slot {index} does not exist"
            ))),
        }
    }

    /// Natural-language summary of the strategy's rules.
    pub fn describe(&self) -> String {
        let mut out = format!("Strategy: {}\n", self.name);
        let text = |slot: &IndicatorSlot| {
            slot.indicator()
                .map(|ind| ind.describe())
                .unwrap_or_default()
        };
        let point_text = |role: SlotRole| {
            self.slots
                .iter()
                .find(|s| s.role == role)
                .map(|s| text(s))
                .unwrap_or_default()
        };
        let conditions = |role: SlotRole, long: bool| -> Vec<String> {
            self.slots
                .iter()
                .filter(|s| s.role == role)
                .map(|s| {
                    let d = text(s);
                    if long { d.long } else { d.short }
                })
                .filter(|line| !line.is_empty())
                .collect()
        };

        let entry = point_text(SlotRole::EntryPoint);
        let exit = point_text(SlotRole::ExitPoint);
        for (side, long) in [("long", true), ("short", false)] {
            let entry_text = if long { &entry.long } else { &entry.short };
            out.push_str(&format!("Open a new {side} position {entry_text}"));
            push_conditions(&mut out, &conditions(SlotRole::EntryFilter, long));
        }
        for (side, long) in [("long", true), ("short", false)] {
            let exit_text = if long { &exit.long } else { &exit.short };
            out.push_str(&format!("Close an existing {side} position {exit_text}"));
            push_conditions(&mut out, &conditions(SlotRole::ExitFilter, long));
        }

        for kind in ProtectionKind::ALL {
            let protection = self.protection(kind);
            if protection.enabled {
                out.push_str(&format!("{}: {} points\n", kind.caption(), protection.distance));
            }
        }
        out.push_str(&format!("Same direction signal: {}\n", self.same_signal_action));
        out.push_str(&format!("Opposite direction signal: {}\n", self.opposite_signal_action));
        out
    }
}

fn push_conditions(out: &mut String, conditions: &[String]) {
    if conditions.is_empty() {
        out.push('\n');
        return;
    }
    out.push_str(" when all the following logical conditions are satisfied:\n");
    for line in conditions {
        out.push_str(&format!("  - {line}\n"));
    }
}
