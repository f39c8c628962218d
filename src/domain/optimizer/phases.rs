//! The six mutation phases of an optimization round.

use super::{Acceptance, Optimizer, SCORE_FLOOR};
use crate::domain::error::GeneratorError;
use crate::domain::indicator::registry;
use crate::domain::strategy::{
    OppositeDirSignalAction, Protection, ProtectionKind, SameDirSignalAction, SlotStatus,
};
use rand::seq::SliceRandom;
use rand::Rng;

/// Fraction of the remaining distance to the default covered per step.
const REDUCTION_STEP: f64 = 0.75;
const DEFAULT_TOLERANCE: f64 = 1e-5;

impl Optimizer {
    /// Phase 1: randomize one enabled numeric parameter per unlocked slot.
    pub(crate) fn change_numeric_parameters(&mut self) -> Result<(), GeneratorError> {
        for round in 0..self.options.max_numeric_rounds {
            if self.is_cancelled() {
                return Ok(());
            }
            let mut evaluated = false;
            let mut last_accepted = false;

            for slot in 0..self.current.slots.len() {
                if self.current.slots[slot].status == SlotStatus::Locked {
                    continue;
                }
                if self.is_cancelled() {
                    return Ok(());
                }
                let candidates: Vec<usize> =
                    self.current.slots[slot].param.enabled_numeric().collect();
                let Some(&index) = candidates.choose(&mut self.rng) else {
                    continue;
                };

                let param = &mut self.current.slots[slot].param.num[index];
                let drawn = draw_within(&mut self.rng, param.min, param.max);
                param.value = param.round(drawn);
                tracing::debug!(
                    round,
                    slot,
                    param = %param.caption,
                    value = param.value,
                    "numeric mutation"
                );

                self.recalculate_slot(slot)?;
                last_accepted = self.score_candidate(Acceptance::BetterOrSame)?;
                evaluated = true;
            }

            if !evaluated || !last_accepted {
                break;
            }
        }
        Ok(())
    }

    /// Phase 2: search permanent stop loss, take profit and break even.
    pub(crate) fn change_protections(&mut self) -> Result<(), GeneratorError> {
        let multiplier = if self.five_digits() { 50 } else { 5 };
        for kind in ProtectionKind::ALL {
            loop {
                if self.is_cancelled()
                    || self.preserves(kind)
                    || self.best.properties_status == SlotStatus::Locked
                {
                    break;
                }
                if kind != ProtectionKind::StopLoss && !self.current.protection(kind).enabled {
                    break;
                }

                let distance = multiplier * self.rng.gen_range(5..100);
                *self.current.protection_mut(kind) = Protection::enabled(distance);
                tracing::debug!(protection = kind.caption(), distance, "protection mutation");

                if !self.score_candidate(Acceptance::StrictlyBetter)? {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Phase 3: reset same/opposite direction signal actions to Nothing.
    pub(crate) fn normalize_signal_actions(&mut self) -> Result<(), GeneratorError> {
        if self.best.properties_status != SlotStatus::Open
            || self.options.preserve_same_dir_action
            || self.options.preserve_opp_dir_action
        {
            return Ok(());
        }

        if self.current.same_signal_action != SameDirSignalAction::Nothing && !self.is_cancelled() {
            self.current.same_signal_action = SameDirSignalAction::Nothing;
            self.score_candidate(Acceptance::BetterOrSame)?;
        }
        if self.current.opposite_signal_action != OppositeDirSignalAction::Nothing
            && !self.is_cancelled()
        {
            self.current.opposite_signal_action = OppositeDirSignalAction::Nothing;
            self.score_candidate(Acceptance::BetterOrSame)?;
        }
        Ok(())
    }

    /// Phase 4: try removing every open filter once.
    pub(crate) fn remove_needless_filters(&mut self) -> Result<(), GeneratorError> {
        let mut slot = 1;
        while slot < self.current.slots.len() {
            if self.is_cancelled() {
                break;
            }
            if !self.current.slots[slot].is_removable() {
                slot += 1;
                continue;
            }

            let removed = self.current.remove_filter(slot)?;
            tracing::debug!(slot, filter = %removed.label(), "filter removal");
            // An accepted removal shifts the next slot into `slot`.
            if !self.score_candidate(Acceptance::BetterOrSame)? {
                slot += 1;
            }
        }
        Ok(())
    }

    /// Phase 5: try disabling each enabled protection.
    pub(crate) fn remove_protections(&mut self) -> Result<(), GeneratorError> {
        let parked = if self.five_digits() { 1000 } else { 100 };
        for kind in ProtectionKind::ALL {
            if self.is_cancelled() {
                break;
            }
            if self.preserves(kind)
                || self.best.properties_status != SlotStatus::Open
                || !self.current.protection(kind).enabled
            {
                continue;
            }
            *self.current.protection_mut(kind) = Protection::disabled(parked);
            tracing::debug!(protection = kind.caption(), "protection removal");
            self.score_candidate(Acceptance::BetterOrSame)?;
        }
        Ok(())
    }

    /// Phase 6: walk numeric parameters back toward their defaults.
    pub(crate) fn reduce_numeric_values(&mut self) -> Result<(), GeneratorError> {
        if self.options.use_default_indicator_values {
            return Ok(());
        }

        for slot in 0..self.current.slots.len() {
            if self.best_score <= SCORE_FLOOR {
                break;
            }
            if self.current.slots[slot].status == SlotStatus::Locked {
                continue;
            }
            let enabled: Vec<usize> = self.current.slots[slot].param.enabled_numeric().collect();
            for index in enabled {
                loop {
                    if self.is_cancelled() {
                        return Ok(());
                    }
                    let Some(value) = self.next_reduction(slot, index)? else {
                        break;
                    };
                    self.current.slots[slot].param.num[index].value = value;
                    tracing::debug!(slot, index, value, "reduction toward default");

                    self.recalculate_slot(slot)?;
                    if !self.score_candidate(Acceptance::StrictlyBetter)? {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// The next value for a reduction step, or `None` when the parameter is
    /// already at its default, would not move, or would pass the default.
    fn next_reduction(&self, slot: usize, index: usize) -> Result<Option<f64>, GeneratorError> {
        let param = &self.current.slots[slot].param;
        let num = &param.num[index];
        if num.caption == "Level" && !param.selected_logic().uses_level() {
            return Ok(None);
        }

        let default =
            registry::default_numeric_value(&param.indicator_name, param.slot_role, index)?;
        let old = num.value;
        if (old - default).abs() < DEFAULT_TOLERANCE {
            return Ok(None);
        }

        let value = num.round(old + (default - old) * REDUCTION_STEP);
        let no_progress = (value - old).abs() < DEFAULT_TOLERANCE;
        let overshoot = (value - default) * (old - default) < 0.0;
        if no_progress || overshoot {
            return Ok(None);
        }
        Ok(Some(value))
    }

    fn preserves(&self, kind: ProtectionKind) -> bool {
        match kind {
            ProtectionKind::StopLoss => self.options.preserve_permanent_sl,
            ProtectionKind::TakeProfit => self.options.preserve_permanent_tp,
            ProtectionKind::BreakEven => self.options.preserve_break_even,
        }
    }
}

/// Uniform draw in `[min, max]`; a degenerate range yields `min`.
fn draw_within(rng: &mut impl Rng, min: f64, max: f64) -> f64 {
    if min < max {
        rng.gen_range(min..=max)
    } else {
        min
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::closes_dataset;
    use crate::domain::indicator::bar_price::{BAR_CLOSING, BAR_OPENING};
    use crate::domain::indicator::{cci, rsi};
    use crate::domain::optimizer::{OptimizerOptions, Phase};
    use crate::domain::param::SlotRole;
    use crate::domain::strategy::{IndicatorSlot, Strategy};
    use crate::ports::backtest_port::Backtester;
    use crate::ports::dataset_port::PriceDataset;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Scores with a caller-supplied function and counts calls.
    struct ScoreFn<F> {
        score: F,
        calls: AtomicUsize,
    }

    impl<F> ScoreFn<F> {
        fn new(score: F) -> Self {
            Self {
                score,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl<F> Backtester for ScoreFn<F>
    where
        F: Fn(&Strategy) -> f64 + Send + Sync,
    {
        fn evaluate(
            &self,
            strategy: &Strategy,
            _data: &dyn PriceDataset,
        ) -> Result<f64, GeneratorError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok((self.score)(strategy))
        }
    }

    fn strategy() -> Strategy {
        Strategy::from_slots(
            "phase test",
            vec![
                IndicatorSlot::new(BAR_OPENING, SlotRole::EntryPoint).unwrap(),
                IndicatorSlot::new(rsi::NAME, SlotRole::EntryFilter).unwrap(),
                IndicatorSlot::new(cci::NAME, SlotRole::EntryFilter).unwrap(),
                IndicatorSlot::new(BAR_CLOSING, SlotRole::ExitPoint).unwrap(),
            ],
        )
        .unwrap()
    }

    fn dataset() -> Arc<dyn PriceDataset> {
        let closes: Vec<f64> = (0..80).map(|i| 1.2 + (i as f64 * 0.2).sin() * 0.01).collect();
        Arc::new(closes_dataset(&closes))
    }

    fn optimizer<F>(strategy: Strategy, score: F, options: OptimizerOptions) -> Optimizer
    where
        F: Fn(&Strategy) -> f64 + Send + Sync + 'static,
    {
        Optimizer::new(strategy, dataset(), Arc::new(ScoreFn::new(score)), options).unwrap()
    }

    #[test]
    fn draw_within_degenerate_range() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(draw_within(&mut rng, 3.0, 3.0), 3.0);
        assert_eq!(draw_within(&mut rng, 5.0, 1.0), 5.0);
        let v = draw_within(&mut rng, 1.0, 2.0);
        assert!((1.0..=2.0).contains(&v));
    }

    mod numeric {
        use super::*;

        #[test]
        fn values_stay_within_bounds_and_precision() {
            let mut opt = optimizer(strategy(), |_| 100.0, OptimizerOptions::default());
            opt.change_numeric_parameters().unwrap();
            for slot in &opt.best().slots {
                for p in slot.param.num.iter().filter(|p| p.enabled) {
                    assert!(p.value >= p.min && p.value <= p.max, "{} = {}", p.caption, p.value);
                    assert_eq!(p.round(p.value), p.value);
                }
            }
            assert_eq!(opt.best_score(), 100.0);
        }

        #[test]
        fn locked_slots_are_untouched() {
            let mut s = strategy();
            s.slots[1].status = SlotStatus::Locked;
            let before = s.slots[1].param.clone();
            let mut opt = optimizer(s, |_| 100.0, OptimizerOptions::default());
            opt.change_numeric_parameters().unwrap();
            assert_eq!(opt.best().slots[1].param, before);
        }

        #[test]
        fn rounds_are_bounded() {
            let opt_calls = |max_rounds: usize| {
                let mut opt = optimizer(
                    strategy(),
                    |_| 100.0,
                    OptimizerOptions {
                        max_numeric_rounds: max_rounds,
                        ..OptimizerOptions::default()
                    },
                );
                let before = opt.evaluations();
                opt.change_numeric_parameters().unwrap();
                opt.evaluations() - before
            };
            // Two slots carry numeric parameters; every attempt is accepted.
            assert_eq!(opt_calls(1), 2);
            assert_eq!(opt_calls(5), 10);
        }

        #[test]
        fn rejection_restores_parameters() {
            let start = strategy();
            let rsi_period = start.slots[1].param.num[0].value;
            let mut opt = optimizer(
                start,
                move |s| if s.slots[1].param.num[0].value == rsi_period { 10.0 } else { 1.0 },
                OptimizerOptions::default(),
            );
            opt.change_numeric_parameters().unwrap();
            assert_eq!(opt.current().slots[1].param, opt.best().slots[1].param);
            assert_eq!(opt.best_score(), 10.0);
        }
    }

    mod protections {
        use super::*;

        fn sl_score(s: &Strategy) -> f64 {
            if s.permanent_sl.enabled {
                10_000.0 - s.permanent_sl.distance as f64
            } else {
                0.0
            }
        }

        #[test]
        fn stop_loss_is_switched_on() {
            let mut opt = optimizer(strategy(), sl_score, OptimizerOptions::default());
            opt.change_protections().unwrap();
            let sl = opt.best().permanent_sl;
            assert!(sl.enabled);
            assert_eq!(sl.distance % 50, 0);
            assert!((250..5000).contains(&sl.distance));
            assert!(!opt.best().permanent_tp.enabled);
        }

        #[test]
        fn preserve_flag_blocks_search() {
            let options = OptimizerOptions {
                preserve_permanent_sl: true,
                ..OptimizerOptions::default()
            };
            let mut opt = optimizer(strategy(), sl_score, options);
            opt.change_protections().unwrap();
            assert!(!opt.best().permanent_sl.enabled);
            assert_eq!(opt.evaluations(), 1);
        }

        #[test]
        fn locked_properties_block_search() {
            let mut s = strategy();
            s.properties_status = SlotStatus::Locked;
            let mut opt = optimizer(s, sl_score, OptimizerOptions::default());
            opt.change_protections().unwrap();
            assert_eq!(opt.evaluations(), 1);
        }

        #[test]
        fn take_profit_only_tuned_when_enabled() {
            let mut s = strategy();
            s.permanent_tp = Protection::enabled(400);
            let mut opt = optimizer(
                s,
                |s| if s.permanent_tp.enabled { s.permanent_tp.distance as f64 } else { 0.0 },
                OptimizerOptions {
                    preserve_permanent_sl: true,
                    ..OptimizerOptions::default()
                },
            );
            opt.change_protections().unwrap();
            assert!(opt.best().permanent_tp.enabled);
            assert!(opt.best_score() >= 400.0);
            assert!(!opt.best().break_even.enabled);
        }
    }

    #[test]
    fn normalization_resets_actions_on_tie() {
        let mut s = strategy();
        s.same_signal_action = SameDirSignalAction::Add;
        s.opposite_signal_action = OppositeDirSignalAction::Reverse;
        let mut opt = optimizer(s, |_| 50.0, OptimizerOptions::default());
        opt.normalize_signal_actions().unwrap();
        assert_eq!(opt.best().same_signal_action, SameDirSignalAction::Nothing);
        assert_eq!(opt.best().opposite_signal_action, OppositeDirSignalAction::Nothing);
    }

    #[test]
    fn normalization_respects_preserve_flags() {
        let mut s = strategy();
        s.same_signal_action = SameDirSignalAction::Add;
        let options = OptimizerOptions {
            preserve_opp_dir_action: true,
            ..OptimizerOptions::default()
        };
        let mut opt = optimizer(s, |_| 50.0, options);
        opt.normalize_signal_actions().unwrap();
        assert_eq!(opt.best().same_signal_action, SameDirSignalAction::Add);
    }

    mod filters {
        use super::*;

        #[test]
        fn removes_adjacent_filters() {
            let mut opt = optimizer(strategy(), |_| 10.0, OptimizerOptions::default());
            opt.remove_needless_filters().unwrap();
            assert_eq!(opt.best().slots.len(), 2);
            assert!(opt.best().validate().is_ok());
        }

        #[test]
        fn keeps_filters_that_matter() {
            let mut opt = optimizer(
                strategy(),
                |s| s.filters().count() as f64,
                OptimizerOptions::default(),
            );
            opt.remove_needless_filters().unwrap();
            assert_eq!(opt.best().slots.len(), 4);
            assert_eq!(opt.current().slots.len(), 4);
        }

        #[test]
        fn locked_and_linked_filters_stay() {
            let mut s = strategy();
            s.slots[1].status = SlotStatus::Linked;
            s.slots[2].status = SlotStatus::Locked;
            let mut opt = optimizer(s, |_| 10.0, OptimizerOptions::default());
            opt.remove_needless_filters().unwrap();
            assert_eq!(opt.best().slots.len(), 4);
            assert_eq!(opt.evaluations(), 1);
        }
    }

    #[test]
    fn protection_removal_parks_distance() {
        let mut s = strategy();
        s.permanent_sl = Protection::enabled(300);
        s.break_even = Protection::enabled(150);
        let options = OptimizerOptions {
            preserve_break_even: true,
            ..OptimizerOptions::default()
        };
        let mut opt = optimizer(s, |_| 10.0, options);
        opt.remove_protections().unwrap();
        assert_eq!(opt.best().permanent_sl, Protection::disabled(1000));
        assert_eq!(opt.best().break_even, Protection::enabled(150));
    }

    mod reduction {
        use super::*;

        /// Rewards RSI periods close to 14.
        fn near_default(s: &Strategy) -> f64 {
            1000.0 - (s.slots[1].param.num[0].value - 14.0).abs()
        }

        #[test]
        fn moves_toward_default() {
            let mut s = strategy();
            s.slots[1].param.num[0].value = 94.0;
            let mut opt = optimizer(s, near_default, OptimizerOptions::default());
            opt.reduce_numeric_values().unwrap();
            // 94 -> 34 -> 19 -> 15.25 rounds to 15 -> 14.25 rounds to 14
            assert_eq!(opt.best().slots[1].param.num[0].value, 14.0);
            assert!(opt.best_score() > 999.0);
        }

        #[test]
        fn skipped_below_floor() {
            let mut s = strategy();
            s.slots[1].param.num[0].value = 94.0;
            let mut opt = optimizer(s, |s| near_default(s) - 900.0, OptimizerOptions::default());
            opt.reduce_numeric_values().unwrap();
            assert_eq!(opt.best().slots[1].param.num[0].value, 94.0);
        }

        #[test]
        fn skipped_with_default_values_option() {
            let mut s = strategy();
            s.slots[1].param.num[0].value = 94.0;
            let options = OptimizerOptions {
                use_default_indicator_values: true,
                ..OptimizerOptions::default()
            };
            let mut opt = optimizer(s, near_default, options);
            opt.reduce_numeric_values().unwrap();
            assert_eq!(opt.evaluations(), 1);
        }

        #[test]
        fn level_skipped_when_logic_ignores_it() {
            let mut s = strategy();
            // Logic 0 is "rises", which has no level.
            s.slots[1].param.list[0].select(0);
            s.slots[1].param.num[1].value = 80.0;
            let mut opt = optimizer(
                s,
                |s| 1000.0 - s.slots[1].param.num[1].value,
                OptimizerOptions::default(),
            );
            opt.reduce_numeric_values().unwrap();
            assert_eq!(opt.best().slots[1].param.num[1].value, 80.0);
        }
    }

    #[test]
    fn phase_names() {
        assert_eq!(Phase::FilterRemoval.to_string(), "filter removal");
    }
}
