//! Moving averages shared by the indicators.
//!
//! Output has the source length. Bars before `first_bar + period - 1` hold
//! 0.0; source values before `first_bar` are never read.
//!
//! Exponential and Smoothed are seeded with the simple mean of the first
//! window: k = 2/(n+1) for Exponential, Wilder's (prev*(n-1) + x)/n for
//! Smoothed.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaMethod {
    Simple,
    Weighted,
    Exponential,
    Smoothed,
}

impl MaMethod {
    pub const ALL: [MaMethod; 4] = [
        MaMethod::Simple,
        MaMethod::Weighted,
        MaMethod::Exponential,
        MaMethod::Smoothed,
    ];

    pub fn from_index(index: usize) -> MaMethod {
        Self::ALL.get(index).copied().unwrap_or(MaMethod::Simple)
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            MaMethod::Simple => "Simple",
            MaMethod::Weighted => "Weighted",
            MaMethod::Exponential => "Exponential",
            MaMethod::Smoothed => "Smoothed",
        }
    }

    pub fn labels() -> Vec<String> {
        Self::ALL.iter().map(|m| m.label().to_string()).collect()
    }
}

/// First bar holding a defined average.
pub fn first_valid_bar(period: usize, first_bar: usize) -> usize {
    first_bar.saturating_add(period.max(1) - 1)
}

pub fn moving_average(
    period: usize,
    method: MaMethod,
    source: &[f64],
    first_bar: usize,
) -> Vec<f64> {
    let period = period.max(1);
    let mut out = vec![0.0; source.len()];
    let start = first_valid_bar(period, first_bar);
    if start >= source.len() {
        return out;
    }

    match method {
        MaMethod::Simple => {
            let mut sum: f64 = source[first_bar..start].iter().sum();
            for bar in start..source.len() {
                sum += source[bar];
                out[bar] = sum / period as f64;
                sum -= source[bar + 1 - period];
            }
        }
        MaMethod::Weighted => {
            let denom = (period * (period + 1)) as f64 / 2.0;
            for bar in start..source.len() {
                let window = &source[bar + 1 - period..=bar];
                let weighted: f64 = window
                    .iter()
                    .enumerate()
                    .map(|(i, v)| v * (i + 1) as f64)
                    .sum();
                out[bar] = weighted / denom;
            }
        }
        MaMethod::Exponential | MaMethod::Smoothed => {
            let seed: f64 = source[first_bar..=start].iter().sum::<f64>() / period as f64;
            out[start] = seed;
            let mut prev = seed;
            for bar in (start + 1)..source.len() {
                prev = if method == MaMethod::Exponential {
                    let k = 2.0 / (period as f64 + 1.0);
                    source[bar] * k + prev * (1.0 - k)
                } else {
                    (prev * (period - 1) as f64 + source[bar]) / period as f64
                };
                out[bar] = prev;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn simple_average() {
        let s = [1.0, 2.0, 3.0, 4.0, 5.0];
        let ma = moving_average(3, MaMethod::Simple, &s, 0);
        assert_eq!(ma[..2], [0.0, 0.0]);
        assert_relative_eq!(ma[2], 2.0);
        assert_relative_eq!(ma[3], 3.0);
        assert_relative_eq!(ma[4], 4.0);
    }

    #[test]
    fn weighted_average() {
        let s = [1.0, 2.0, 3.0];
        let ma = moving_average(3, MaMethod::Weighted, &s, 0);
        // (1*1 + 2*2 + 3*3) / 6
        assert_relative_eq!(ma[2], 14.0 / 6.0);
    }

    #[test]
    fn exponential_seeded_with_simple_mean() {
        let s = [2.0, 4.0, 6.0, 8.0];
        let ma = moving_average(3, MaMethod::Exponential, &s, 0);
        assert_relative_eq!(ma[2], 4.0);
        // k = 0.5: 8*0.5 + 4*0.5
        assert_relative_eq!(ma[3], 6.0);
    }

    #[test]
    fn smoothed_uses_wilder_recursion() {
        let s = [2.0, 4.0, 6.0, 9.0];
        let ma = moving_average(3, MaMethod::Smoothed, &s, 0);
        assert_relative_eq!(ma[2], 4.0);
        // (4*2 + 9) / 3
        assert_relative_eq!(ma[3], 17.0 / 3.0);
    }

    #[test]
    fn respects_source_first_bar() {
        let s = [f64::NAN, f64::NAN, 1.0, 1.0, 1.0];
        for method in MaMethod::ALL {
            let ma = moving_average(2, method, &s, 2);
            assert_eq!(ma[..3], [0.0, 0.0, 0.0]);
            assert_relative_eq!(ma[3], 1.0);
            assert_relative_eq!(ma[4], 1.0);
        }
    }

    #[test]
    fn short_source_stays_zero() {
        let ma = moving_average(10, MaMethod::Exponential, &[1.0, 2.0], 0);
        assert_eq!(ma, vec![0.0, 0.0]);
        assert!(moving_average(3, MaMethod::Simple, &[], 0).is_empty());
    }

    #[test]
    fn period_one_is_identity() {
        let s = [3.0, 1.0, 4.0];
        for method in MaMethod::ALL {
            let ma = moving_average(1, method, &s, 0);
            for (a, b) in ma.iter().zip(s.iter()) {
                assert_relative_eq!(*a, *b);
            }
        }
    }

    #[test]
    fn method_labels() {
        assert_eq!(MaMethod::from_index(3), MaMethod::Smoothed);
        assert_eq!(MaMethod::from_index(42), MaMethod::Simple);
        assert_eq!(MaMethod::labels(), vec!["Simple", "Weighted", "Exponential", "Smoothed"]);
    }
}
