use std::fmt;

use crate::filter::{FilterOutcome, Thresholds};
use crate::frame::BYTES_PER_PIXEL;

/// Share of red pixels in the most recently processed frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RedStatistic {
    pub matched: usize,
    pub total: usize,
    pub percentage: f64,
}

impl RedStatistic {
    /// The reset value shown while nothing is being processed.
    pub const ZERO: RedStatistic = RedStatistic {
        matched: 0,
        total: 0,
        percentage: 0.0,
    };

    pub fn from_counts(matched: usize, total: usize) -> Self {
        Self {
            matched,
            total,
            percentage: percentage(matched, total),
        }
    }
}

impl From<FilterOutcome> for RedStatistic {
    fn from(outcome: FilterOutcome) -> Self {
        Self::from_counts(outcome.matched, outcome.total)
    }
}

impl fmt::Display for RedStatistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.percentage)
    }
}

/// `100 * matched / total`; zero for an empty frame.
pub fn percentage(matched: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    100.0 * matched as f64 / total as f64
}

/// Count matching pixels in an RGBA buffer without modifying it.
pub fn red_percentage(rgba: &[u8], thresholds: &Thresholds) -> RedStatistic {
    let total = rgba.len() / BYTES_PER_PIXEL;
    let matched = rgba
        .chunks_exact(BYTES_PER_PIXEL)
        .filter(|px| thresholds.is_match(px[0], px[1], px[2]))
        .count();
    RedStatistic::from_counts(matched, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::RedFilter;

    fn scenario() -> Vec<u8> {
        vec![
            200, 10, 10, 255, //
            50, 50, 50, 255, //
            200, 200, 200, 255, //
            0, 0, 0, 0,
        ]
    }

    #[test]
    fn quarter_red_frame() {
        let stat = red_percentage(&scenario(), &Thresholds::STANDARD);
        assert_eq!(stat.matched, 1);
        assert_eq!(stat.total, 4);
        assert_eq!(stat.percentage, 25.0);
        assert_eq!(stat.to_string(), "25.00%");
    }

    #[test]
    fn empty_frame_is_zero() {
        assert_eq!(red_percentage(&[], &Thresholds::STANDARD), RedStatistic::ZERO);
    }

    #[test]
    fn in_pass_count_agrees_with_untouched_count() {
        let mut buf = scenario();
        let before = red_percentage(&buf, &Thresholds::STANDARD);
        let during = RedStatistic::from(RedFilter::default().apply(&mut buf));
        assert_eq!(before, during);
    }

    #[test]
    fn two_decimal_formatting() {
        let stat = RedStatistic::from_counts(1, 3);
        assert_eq!(stat.to_string(), "33.33%");
    }
}
