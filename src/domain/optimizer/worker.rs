//! Background optimization thread.
//!
//! The worker owns the [`Optimizer`]; the caller only sees events on the
//! channel and the outcome returned by [`OptimizerHandle::join`]. A failed
//! run still returns its outcome, with the error in `failure`.

use super::{OptimizationOutcome, Optimizer, OptimizerEvent};
use crate::domain::cancel::CancellationToken;
use crate::domain::error::GeneratorError;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

pub struct OptimizerHandle {
    pub events: Receiver<OptimizerEvent>,
    cancel: CancellationToken,
    thread: JoinHandle<OptimizationOutcome>,
}

impl OptimizerHandle {
    /// Asks the worker to stop at its next cancellation check.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Waits for the worker and returns its outcome; errs only if the
    /// thread panicked.
    pub fn join(self) -> Result<OptimizationOutcome, GeneratorError> {
        match self.thread.join() {
            Ok(outcome) => Ok(outcome),
            Err(_) => Err(GeneratorError::Evaluator {
                reason: "optimizer thread panicked".to_string(),
            }),
        }
    }
}

/// Runs [`Optimizer::optimize`] on a dedicated thread.
pub fn spawn_optimizer(optimizer: Optimizer) -> Result<OptimizerHandle, GeneratorError> {
    let (tx, rx) = mpsc::channel();
    let cancel = optimizer.cancellation();
    let mut optimizer = optimizer.with_events(tx);

    let thread = thread::Builder::new()
        .name("stratgen-optimizer".into())
        .spawn(move || optimizer.optimize())?;

    Ok(OptimizerHandle {
        events: rx,
        cancel,
        thread,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::closes_dataset;
    use crate::domain::indicator::bar_price::{BAR_CLOSING, BAR_OPENING};
    use crate::domain::indicator::rsi;
    use crate::domain::optimizer::OptimizerOptions;
    use crate::domain::param::SlotRole;
    use crate::domain::strategy::{IndicatorSlot, Strategy};
    use crate::ports::backtest_port::Backtester;
    use crate::ports::dataset_port::PriceDataset;
    use std::sync::Arc;

    struct Constant(f64);

    impl Backtester for Constant {
        fn evaluate(&self, _: &Strategy, _: &dyn PriceDataset) -> Result<f64, GeneratorError> {
            Ok(self.0)
        }
    }

    fn optimizer(score: f64) -> Optimizer {
        let strategy = Strategy::from_slots(
            "worker",
            vec![
                IndicatorSlot::new(BAR_OPENING, SlotRole::EntryPoint).unwrap(),
                IndicatorSlot::new(rsi::NAME, SlotRole::EntryFilter).unwrap(),
                IndicatorSlot::new(BAR_CLOSING, SlotRole::ExitPoint).unwrap(),
            ],
        )
        .unwrap();
        let closes: Vec<f64> = (0..60).map(|i| 1.0 + i as f64 * 0.001).collect();
        Optimizer::new(
            strategy,
            Arc::new(closes_dataset(&closes)),
            Arc::new(Constant(score)),
            OptimizerOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn finishes_and_reports() {
        let handle = spawn_optimizer(optimizer(10.0)).unwrap();
        let events: Vec<OptimizerEvent> = handle.events.iter().collect();
        let outcome = handle.join().unwrap();

        assert!(!outcome.cancelled);
        assert_eq!(outcome.rounds_run, 1);
        assert!(matches!(events.first(), Some(OptimizerEvent::PhaseStarted(_))));
        assert!(matches!(
            events.last(),
            Some(OptimizerEvent::Finished { cancelled: false, .. })
        ));
        assert!(events.iter().any(|e| matches!(e, OptimizerEvent::Checkpoint { .. })));
    }

    #[test]
    fn cancelled_before_start() {
        let opt = optimizer(10.0);
        opt.cancellation().cancel();
        let handle = spawn_optimizer(opt).unwrap();
        let outcome = handle.join().unwrap();
        assert!(outcome.cancelled);
        assert_eq!(outcome.rounds_run, 0);
        assert_eq!(outcome.evaluations, 1);
    }
}
