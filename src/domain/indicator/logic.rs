//! Signal-logic primitives.
//!
//! Every function fills a pair of per-bar permission slices (long, short)
//! from an indicator series. Bars whose lookback would reach below
//! `first_bar` are left `false`, so values in the warm-up region are never
//! read.
//!
//! `lag` is 0 or 1: the "use previous bar value" option shifts the compared
//! bar back by one.

pub const EPSILON: f64 = 1e-6;

/// What an indicator's logic choice means. Assigned when the indicator is
/// initialized, one tag per logic list item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalLogic {
    Rises,
    Falls,
    HigherThanLevel,
    LowerThanLevel,
    CrossesLevelUpward,
    CrossesLevelDownward,
    ChangesDirectionUpward,
    ChangesDirectionDownward,
    BarOpensAbove,
    BarOpensBelow,
    BarClosesAbove,
    BarClosesBelow,
    PositionOpensAbove,
    PositionOpensBelow,
    /// Entry or exit at the indicator's price.
    AtPrice,
    NotDefined,
}

impl SignalLogic {
    /// Whether the logic compares against a level parameter.
    pub fn uses_level(self) -> bool {
        matches!(
            self,
            SignalLogic::HigherThanLevel
                | SignalLogic::LowerThanLevel
                | SignalLogic::CrossesLevelUpward
                | SignalLogic::CrossesLevelDownward
        )
    }
}

fn clear(long: &mut [bool], short: &mut [bool]) {
    long.iter_mut().for_each(|v| *v = false);
    short.iter_mut().for_each(|v| *v = false);
}

fn span(series: &[f64], long: &[bool], short: &[bool]) -> usize {
    series.len().min(long.len()).min(short.len())
}

/// Runs `rule(b)` for every bar whose base bar `b = bar - lag` has
/// `lookback` defined predecessors at or above `first_bar`.
fn apply<F>(
    series: &[f64],
    first_bar: usize,
    lag: usize,
    lookback: usize,
    long: &mut [bool],
    short: &mut [bool],
    rule: F,
) where
    F: Fn(usize) -> (bool, bool),
{
    clear(long, short);
    let n = span(series, long, short);
    for bar in first_bar.saturating_add(lag + lookback)..n {
        let (l, s) = rule(bar - lag);
        long[bar] = l;
        short[bar] = s;
    }
}

pub fn rises(series: &[f64], first_bar: usize, lag: usize, long: &mut [bool], short: &mut [bool]) {
    apply(series, first_bar, lag, 1, long, short, |b| {
        (
            series[b] > series[b - 1] + EPSILON,
            series[b] < series[b - 1] - EPSILON,
        )
    });
}

pub fn falls(series: &[f64], first_bar: usize, lag: usize, long: &mut [bool], short: &mut [bool]) {
    rises(series, first_bar, lag, short, long);
}

pub fn higher_than_level(
    series: &[f64],
    first_bar: usize,
    lag: usize,
    level_long: f64,
    level_short: f64,
    long: &mut [bool],
    short: &mut [bool],
) {
    apply(series, first_bar, lag, 0, long, short, |b| {
        (
            series[b] > level_long + EPSILON,
            series[b] < level_short - EPSILON,
        )
    });
}

pub fn lower_than_level(
    series: &[f64],
    first_bar: usize,
    lag: usize,
    level_long: f64,
    level_short: f64,
    long: &mut [bool],
    short: &mut [bool],
) {
    apply(series, first_bar, lag, 0, long, short, |b| {
        (
            series[b] < level_long - EPSILON,
            series[b] > level_short + EPSILON,
        )
    });
}

/// Strictly below the level on the previous bar and strictly above it now.
/// Touching the level does not count as a cross.
pub fn crosses_level_upward(
    series: &[f64],
    first_bar: usize,
    lag: usize,
    level_long: f64,
    level_short: f64,
    long: &mut [bool],
    short: &mut [bool],
) {
    apply(series, first_bar, lag, 1, long, short, |b| {
        (
            series[b - 1] < level_long - EPSILON && series[b] > level_long + EPSILON,
            series[b - 1] > level_short + EPSILON && series[b] < level_short - EPSILON,
        )
    });
}

pub fn crosses_level_downward(
    series: &[f64],
    first_bar: usize,
    lag: usize,
    level_long: f64,
    level_short: f64,
    long: &mut [bool],
    short: &mut [bool],
) {
    apply(series, first_bar, lag, 1, long, short, |b| {
        (
            series[b - 1] > level_long + EPSILON && series[b] < level_long - EPSILON,
            series[b - 1] < level_short - EPSILON && series[b] > level_short + EPSILON,
        )
    });
}

/// A local minimum at `bar - 1`. The lag does not apply.
pub fn changes_direction_upward(
    series: &[f64],
    first_bar: usize,
    long: &mut [bool],
    short: &mut [bool],
) {
    apply(series, first_bar, 0, 2, long, short, |b| {
        let trough = series[b - 1] < series[b - 2] - EPSILON && series[b] > series[b - 1] + EPSILON;
        let peak = series[b - 1] > series[b - 2] + EPSILON && series[b] < series[b - 1] - EPSILON;
        (trough, peak)
    });
}

pub fn changes_direction_downward(
    series: &[f64],
    first_bar: usize,
    long: &mut [bool],
    short: &mut [bool],
) {
    changes_direction_upward(series, first_bar, short, long);
}

/// Compares a bar price (open or close) with a reference series.
fn bar_price_vs(
    price: &[f64],
    reference: &[f64],
    first_bar: usize,
    above: bool,
    long: &mut [bool],
    short: &mut [bool],
) {
    clear(long, short);
    let n = span(reference, long, short).min(price.len());
    for bar in first_bar..n {
        let higher = price[bar] > reference[bar] + EPSILON;
        let lower = price[bar] < reference[bar] - EPSILON;
        if above {
            long[bar] = higher;
            short[bar] = lower;
        } else {
            long[bar] = lower;
            short[bar] = higher;
        }
    }
}

pub fn bar_opens_above(
    open: &[f64],
    reference: &[f64],
    first_bar: usize,
    long: &mut [bool],
    short: &mut [bool],
) {
    bar_price_vs(open, reference, first_bar, true, long, short);
}

pub fn bar_opens_below(
    open: &[f64],
    reference: &[f64],
    first_bar: usize,
    long: &mut [bool],
    short: &mut [bool],
) {
    bar_price_vs(open, reference, first_bar, false, long, short);
}

pub fn bar_closes_above(
    close: &[f64],
    reference: &[f64],
    first_bar: usize,
    long: &mut [bool],
    short: &mut [bool],
) {
    bar_price_vs(close, reference, first_bar, true, long, short);
}

pub fn bar_closes_below(
    close: &[f64],
    reference: &[f64],
    first_bar: usize,
    long: &mut [bool],
    short: &mut [bool],
) {
    bar_price_vs(close, reference, first_bar, false, long, short);
}

/// Directional oscillator logic with distinct long and short levels.
/// Tags that are not oscillator logic leave both sides `false`.
#[allow(clippy::too_many_arguments)]
pub fn oscillator_logic(
    series: &[f64],
    first_bar: usize,
    lag: usize,
    level_long: f64,
    level_short: f64,
    logic: SignalLogic,
    long: &mut [bool],
    short: &mut [bool],
) {
    match logic {
        SignalLogic::Rises => rises(series, first_bar, lag, long, short),
        SignalLogic::Falls => falls(series, first_bar, lag, long, short),
        SignalLogic::HigherThanLevel => {
            higher_than_level(series, first_bar, lag, level_long, level_short, long, short)
        }
        SignalLogic::LowerThanLevel => {
            lower_than_level(series, first_bar, lag, level_long, level_short, long, short)
        }
        SignalLogic::CrossesLevelUpward => {
            crosses_level_upward(series, first_bar, lag, level_long, level_short, long, short)
        }
        SignalLogic::CrossesLevelDownward => {
            crosses_level_downward(series, first_bar, lag, level_long, level_short, long, short)
        }
        SignalLogic::ChangesDirectionUpward => {
            changes_direction_upward(series, first_bar, long, short)
        }
        SignalLogic::ChangesDirectionDownward => {
            changes_direction_downward(series, first_bar, long, short)
        }
        _ => clear(long, short),
    }
}

/// Logic for indicators without a direction (volatility and the like): the
/// long reading applies to both sides, so `long == short` on every bar.
pub fn no_direction_oscillator_logic(
    series: &[f64],
    first_bar: usize,
    lag: usize,
    level: f64,
    logic: SignalLogic,
    long: &mut [bool],
    short: &mut [bool],
) {
    let mut scratch = vec![false; short.len()];
    oscillator_logic(series, first_bar, lag, level, level, logic, long, &mut scratch);
    let n = long.len().min(short.len());
    short[..n].copy_from_slice(&long[..n]);
}
