//! Hill-climbing strategy optimizer.
//!
//! [`Optimizer`] owns the strategy under edit (`current`) and the best-known
//! snapshot (`best`). Every mutation is scored by the [`Backtester`]; an
//! accepted mutation replaces the snapshot, a rejected one is undone by
//! restoring `current` from `best`. Between mutations `current` always
//! equals `best`.
//!
//! A round runs six phases in order (see [`Phase`]). Cancellation is polled
//! at every loop head and before each recomputation; a cancelled round keeps
//! whatever was committed so far.

pub mod phases;
pub mod worker;

use crate::domain::cancel::CancellationToken;
use crate::domain::error::GeneratorError;
use crate::domain::strategy::Strategy;
use crate::ports::backtest_port::Backtester;
use crate::ports::dataset_port::PriceDataset;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::sync::mpsc::Sender;
use std::sync::Arc;

/// Scores at or below this never earn a second chance or default reduction.
pub const SCORE_FLOOR: f64 = 500.0;

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerOptions {
    pub seed: u64,
    /// Rounds for [`Optimizer::optimize`].
    pub rounds: usize,
    /// Whether the first round starts from an improved strategy.
    pub is_better: bool,
    pub max_numeric_rounds: usize,
    pub preserve_permanent_sl: bool,
    pub preserve_permanent_tp: bool,
    pub preserve_break_even: bool,
    pub preserve_same_dir_action: bool,
    pub preserve_opp_dir_action: bool,
    pub use_default_indicator_values: bool,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            rounds: 1,
            is_better: true,
            max_numeric_rounds: 5,
            preserve_permanent_sl: false,
            preserve_permanent_tp: false,
            preserve_break_even: false,
            preserve_same_dir_action: false,
            preserve_opp_dir_action: false,
            use_default_indicator_values: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    NumericParameters,
    Protections,
    SignalNormalization,
    FilterRemoval,
    ProtectionRemoval,
    DefaultReduction,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Phase::NumericParameters => "numeric parameters",
            Phase::Protections => "stop loss / take profit / break even",
            Phase::SignalNormalization => "signal normalization",
            Phase::FilterRemoval => "filter removal",
            Phase::ProtectionRemoval => "protection removal",
            Phase::DefaultReduction => "default value reduction",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    /// score >= best
    BetterOrSame,
    /// score > best
    StrictlyBetter,
}

impl Acceptance {
    pub fn accepts(self, score: f64, best: f64) -> bool {
        match self {
            Acceptance::BetterOrSame => score >= best,
            Acceptance::StrictlyBetter => score > best,
        }
    }
}

#[derive(Debug, Clone)]
pub enum OptimizerEvent {
    PhaseStarted(Phase),
    Improved { phase: Phase, score: f64 },
    /// Published after each phase; the only way callers see optimizer state.
    Checkpoint { best: Box<Strategy>, score: f64 },
    Finished { score: f64, cancelled: bool, failed: bool },
}

#[derive(Debug)]
pub struct OptimizationOutcome {
    pub best: Strategy,
    pub initial_score: f64,
    pub best_score: f64,
    pub evaluations: usize,
    /// Rounds whose precondition held and whose phases ran.
    pub rounds_run: usize,
    pub cancelled: bool,
    /// The error that aborted the last round; `best` still holds the
    /// best strategy found before it.
    pub failure: Option<GeneratorError>,
}

impl OptimizationOutcome {
    pub fn improved(&self) -> bool {
        self.best_score > self.initial_score
    }
}

pub struct Optimizer {
    current: Strategy,
    best: Strategy,
    best_score: f64,
    initial_score: f64,
    data: Arc<dyn PriceDataset>,
    backtester: Arc<dyn Backtester>,
    rng: StdRng,
    options: OptimizerOptions,
    cancel: CancellationToken,
    events: Option<Sender<OptimizerEvent>>,
    evaluations: usize,
    rounds_run: usize,
    phase: Phase,
}

impl Optimizer {
    /// Calculates every slot and scores the starting strategy.
    pub fn new(
        mut strategy: Strategy,
        data: Arc<dyn PriceDataset>,
        backtester: Arc<dyn Backtester>,
        options: OptimizerOptions,
    ) -> Result<Self, GeneratorError> {
        strategy.validate()?;
        strategy.recalculate(data.as_ref())?;
        let initial_score = backtester
            .evaluate(&strategy, data.as_ref())
            .map_err(as_evaluator_error)?;
        tracing::info!(strategy = %strategy.name, score = initial_score, "initial evaluation");

        Ok(Self {
            best: strategy.clone(),
            current: strategy,
            best_score: initial_score,
            initial_score,
            data,
            backtester,
            rng: StdRng::seed_from_u64(options.seed),
            options,
            cancel: CancellationToken::new(),
            events: None,
            evaluations: 1,
            rounds_run: 0,
            phase: Phase::NumericParameters,
        })
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_events(mut self, events: Sender<OptimizerEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn current(&self) -> &Strategy {
        &self.current
    }

    pub fn best(&self) -> &Strategy {
        &self.best
    }

    pub fn best_score(&self) -> f64 {
        self.best_score
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    pub fn options(&self) -> &OptimizerOptions {
        &self.options
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Runs `options.rounds` rounds. After the first, a round counts as
    /// "better" when the previous one improved the best score.
    ///
    /// A failing round stops the run; the outcome keeps the best strategy
    /// and carries the error in `failure`.
    pub fn optimize(&mut self) -> OptimizationOutcome {
        let mut is_better = self.options.is_better;
        let mut failure = None;
        for round in 0..self.options.rounds {
            if self.is_cancelled() {
                break;
            }
            let before = self.best_score;
            tracing::debug!(round, is_better, "starting round");
            if let Err(err) = self.run(is_better) {
                tracing::error!(round, error = %err, score = self.best_score, "round aborted");
                failure = Some(err);
                break;
            }
            is_better = self.best_score > before;
        }
        let outcome = OptimizationOutcome {
            failure,
            ..self.outcome()
        };
        self.emit(OptimizerEvent::Finished {
            score: outcome.best_score,
            cancelled: outcome.cancelled,
            failed: outcome.failure.is_some(),
        });
        outcome
    }

    /// One optimization round.
    ///
    /// Runs only when `is_better`, or on a 10% second chance when the best
    /// score exceeds [`SCORE_FLOOR`]. The numeric and protection phases
    /// repeat three times for a better strategy, once otherwise.
    pub fn run(&mut self, is_better: bool) -> Result<OptimizationOutcome, GeneratorError> {
        let second_chance = self.rng.gen_range(0..100) < 10 && self.best_score > SCORE_FLOOR;
        if !(is_better || second_chance) {
            tracing::debug!(score = self.best_score, "round skipped");
            return Ok(self.outcome());
        }
        self.rounds_run += 1;

        let cycles = if is_better { 3 } else { 1 };
        for _ in 0..cycles {
            if !self.enter_phase(Phase::NumericParameters) {
                return Ok(self.outcome());
            }
            self.change_numeric_parameters()?;
            self.checkpoint();

            if !self.enter_phase(Phase::Protections) {
                return Ok(self.outcome());
            }
            self.change_protections()?;
            self.checkpoint();
        }

        if self.enter_phase(Phase::SignalNormalization) {
            self.normalize_signal_actions()?;
            self.checkpoint();
        }
        if self.enter_phase(Phase::FilterRemoval) {
            self.remove_needless_filters()?;
            self.checkpoint();
        }
        if self.enter_phase(Phase::ProtectionRemoval) {
            self.remove_protections()?;
            self.checkpoint();
        }
        if self.enter_phase(Phase::DefaultReduction) {
            self.reduce_numeric_values()?;
            self.checkpoint();
        }

        Ok(self.outcome())
    }

    /// Replaces `current` with a copy of the best-known snapshot.
    pub fn restore_from_best(&mut self) {
        self.current = self.best.clone();
    }

    pub fn outcome(&self) -> OptimizationOutcome {
        OptimizationOutcome {
            best: self.best.clone(),
            initial_score: self.initial_score,
            best_score: self.best_score,
            evaluations: self.evaluations,
            rounds_run: self.rounds_run,
            cancelled: self.is_cancelled(),
            failure: None,
        }
    }

    /// Scores `current` and commits or rolls it back.
    ///
    /// An accepted mutation replaces the snapshot, ties included; the best
    /// score only moves on a strict improvement. An evaluator failure rolls
    /// back and aborts with [`GeneratorError::Evaluator`].
    pub(crate) fn score_candidate(
        &mut self,
        acceptance: Acceptance,
    ) -> Result<bool, GeneratorError> {
        self.evaluations += 1;
        let score = match self.backtester.evaluate(&self.current, self.data.as_ref()) {
            Ok(score) => score,
            Err(err) => {
                tracing::warn!(
                    phase = %self.phase,
                    error = %err,
                    "evaluation failed, restoring best strategy"
                );
                self.restore_from_best();
                return Err(as_evaluator_error(err));
            }
        };

        if !acceptance.accepts(score, self.best_score) {
            tracing::debug!(
                phase = %self.phase,
                score,
                best = self.best_score,
                "mutation rejected"
            );
            self.restore_from_best();
            return Ok(false);
        }

        if score > self.best_score {
            tracing::info!(phase = %self.phase, score, previous = self.best_score, "improved");
            self.best_score = score;
            self.emit(OptimizerEvent::Improved {
                phase: self.phase,
                score,
            });
        } else {
            tracing::debug!(phase = %self.phase, score, "mutation kept at equal score");
        }
        self.best = self.current.clone();
        Ok(true)
    }

    /// Recomputes one slot of `current`, rolling back on failure.
    pub(crate) fn recalculate_slot(&mut self, slot: usize) -> Result<(), GeneratorError> {
        if let Err(err) = self.current.recalculate_slot(slot, self.data.as_ref()) {
            self.restore_from_best();
            return Err(err);
        }
        Ok(())
    }

    pub(crate) fn five_digits(&self) -> bool {
        self.data.instrument().is_five_digits()
    }

    fn enter_phase(&mut self, phase: Phase) -> bool {
        if self.is_cancelled() {
            tracing::info!(phase = %phase, "cancelled before phase");
            return false;
        }
        self.phase = phase;
        tracing::info!(phase = %phase, score = self.best_score, "phase started");
        self.emit(OptimizerEvent::PhaseStarted(phase));
        true
    }

    fn checkpoint(&self) {
        self.emit(OptimizerEvent::Checkpoint {
            best: Box::new(self.best.clone()),
            score: self.best_score,
        });
    }

    fn emit(&self, event: OptimizerEvent) {
        if let Some(tx) = &self.events {
            // A dropped receiver only means nobody is listening.
            let _ = tx.send(event);
        }
    }
}

fn as_evaluator_error(err: GeneratorError) -> GeneratorError {
    match err {
        GeneratorError::Evaluator { .. } => err,
        other => GeneratorError::Evaluator {
            reason: other.to_string(),
        },
    }
}
