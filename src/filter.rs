//! Red pixel classifier and recolor pass.
//!
//! A pixel matches when its red channel is above `red_floor` and its green
//! and blue channels are at most their ceilings. Matches are painted pure
//! red; everything else is dimmed by `dim_factor`. Alpha is never touched.

use serde::{Deserialize, Serialize};

use crate::frame::BYTES_PER_PIXEL;

/// Default attenuation for unmatched pixels.
pub const DEFAULT_DIM_FACTOR: f64 = 0.9;

/// Stronger attenuation preset.
pub const DEEP_DIM_FACTOR: f64 = 0.8;

/// Cutoffs for the red predicate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub red_floor: u8,
    pub green_ceiling: u8,
    pub blue_ceiling: u8,
}

impl Thresholds {
    pub const STANDARD: Thresholds = Thresholds::new(100, 70, 70);
    pub const STRICT: Thresholds = Thresholds::new(150, 110, 110);

    pub const fn new(red_floor: u8, green_ceiling: u8, blue_ceiling: u8) -> Self {
        Self {
            red_floor,
            green_ceiling,
            blue_ceiling,
        }
    }

    /// Parse `"R,G,B"` or a preset name (`standard`, `strict`).
    pub fn parse(value: &str) -> anyhow::Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "standard" => return Ok(Self::STANDARD),
            "strict" => return Ok(Self::STRICT),
            _ => {}
        }
        let parts: Vec<&str> = value.split(',').map(str::trim).collect();
        let [r, g, b] = parts.as_slice() else {
            return Err(anyhow::anyhow!(
                "thresholds must be 'R,G,B' or a preset name, got '{}'",
                value
            ));
        };
        let channel = |raw: &str| {
            raw.parse::<u8>()
                .map_err(|_| anyhow::anyhow!("threshold '{}' is not in 0..=255", raw))
        };
        Ok(Self::new(channel(r)?, channel(g)?, channel(b)?))
    }

    #[inline]
    pub fn is_match(&self, red: u8, green: u8, blue: u8) -> bool {
        red > self.red_floor && green <= self.green_ceiling && blue <= self.blue_ceiling
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Result of one filter pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    /// Pixels that satisfied the predicate before recoloring.
    pub matched: usize,
    /// Pixels visited.
    pub total: usize,
}

/// Classifies and recolors RGBA pixels in place.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RedFilter {
    thresholds: Thresholds,
    dim_factor: f64,
}

impl RedFilter {
    pub fn new(thresholds: Thresholds, dim_factor: f64) -> Self {
        Self {
            thresholds,
            dim_factor,
        }
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn dim_factor(&self) -> f64 {
        self.dim_factor
    }

    pub fn is_match(&self, pixel: [u8; 4]) -> bool {
        self.thresholds.is_match(pixel[0], pixel[1], pixel[2])
    }

    /// Classify each pixel on its incoming values, then recolor it.
    ///
    /// Trailing bytes that do not form a full pixel are left untouched.
    pub fn apply(&self, rgba: &mut [u8]) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();
        for px in rgba.chunks_exact_mut(BYTES_PER_PIXEL) {
            outcome.total += 1;
            if self.thresholds.is_match(px[0], px[1], px[2]) {
                outcome.matched += 1;
                px[0] = 255;
                px[1] = 0;
                px[2] = 0;
            } else {
                px[0] = self.dim(px[0]);
                px[1] = self.dim(px[1]);
                px[2] = self.dim(px[2]);
            }
        }
        outcome
    }

    /// Scale one channel. Rounds half to even, like a clamped byte store.
    #[inline]
    fn dim(&self, channel: u8) -> u8 {
        let scaled = f64::from(channel) * self.dim_factor;
        scaled.round_ties_even().clamp(0.0, 255.0) as u8
    }
}

impl Default for RedFilter {
    fn default() -> Self {
        Self::new(Thresholds::STANDARD, DEFAULT_DIM_FACTOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matched_pixels_become_pure_red_keeping_alpha() {
        let filter = RedFilter::default();
        let mut px = [200u8, 10, 10, 77];
        let outcome = filter.apply(&mut px);
        assert_eq!(px, [255, 0, 0, 77]);
        assert_eq!(outcome, FilterOutcome { matched: 1, total: 1 });
    }

    #[test]
    fn unmatched_pixels_are_dimmed() {
        let filter = RedFilter::default();
        let mut px = [50u8, 50, 50, 255, 200, 200, 200, 255];
        let outcome = filter.apply(&mut px);
        assert_eq!(px, [45, 45, 45, 255, 180, 180, 180, 255]);
        assert_eq!(outcome.matched, 0);
        assert_eq!(outcome.total, 2);
    }

    #[test]
    fn predicate_boundaries() {
        let t = Thresholds::STANDARD;
        assert!(!t.is_match(100, 0, 0), "red floor is exclusive");
        assert!(t.is_match(101, 0, 0));
        assert!(t.is_match(101, 70, 70), "ceilings are inclusive");
        assert!(!t.is_match(101, 71, 70));
        assert!(!t.is_match(101, 70, 71));
    }

    #[test]
    fn strict_preset_changes_classification() {
        let pixel = [140u8, 90, 90, 255];
        assert!(!RedFilter::new(Thresholds::STANDARD, 0.9).is_match(pixel));
        assert!(!RedFilter::new(Thresholds::STRICT, 0.9).is_match(pixel));
        assert!(RedFilter::new(Thresholds::STRICT, 0.9).is_match([151, 110, 110, 0]));
    }

    #[test]
    fn deep_dim_factor() {
        let filter = RedFilter::new(Thresholds::STANDARD, DEEP_DIM_FACTOR);
        let mut px = [100u8, 50, 10, 9];
        filter.apply(&mut px);
        assert_eq!(px, [80, 40, 8, 9]);
    }

    #[test]
    fn dimming_rounds_half_to_even() {
        let filter = RedFilter::new(Thresholds::new(255, 0, 0), 0.5);
        let mut px = [5u8, 7, 3, 1];
        filter.apply(&mut px);
        assert_eq!(px, [2, 4, 2, 1]);
    }

    #[test]
    fn default_dim_rounds_exact_halves_to_even() {
        // 15 * 0.9 = 13.5, 35 * 0.9 = 31.5, 55 * 0.9 = 49.5
        let filter = RedFilter::new(Thresholds::STANDARD, DEFAULT_DIM_FACTOR);
        let mut px = [15u8, 35, 55, 255];
        filter.apply(&mut px);
        assert_eq!(px, [14, 32, 50, 255]);
    }

    #[test]
    fn alpha_does_not_affect_classification() {
        let filter = RedFilter::default();
        let mut px = [200u8, 10, 10, 0];
        assert_eq!(filter.apply(&mut px).matched, 1);
        assert_eq!(px, [255, 0, 0, 0]);
    }

    #[test]
    fn parse_thresholds() {
        assert_eq!(Thresholds::parse("150, 110,110").unwrap(), Thresholds::STRICT);
        assert_eq!(Thresholds::parse("standard").unwrap(), Thresholds::STANDARD);
        assert!(Thresholds::parse("1,2").is_err());
        assert!(Thresholds::parse("1,2,300").is_err());
    }
}
