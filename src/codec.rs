//! Linear code/volts codec.
//!
//! Stateless math converting between an integer device code and a voltage
//! through a `(gain, offset)` pair:
//!
//! ```text
//! volts = code * gain + offset
//! ```
//!
//! The inverse direction floors and then saturates to `[0, full_scale]`.
//! Clamping at both ends is deliberate: callers may command a voltage
//! outside the calibrated range and get the nearest achievable code rather
//! than a failure.

use serde::{Deserialize, Serialize};

/// Linear model coefficients mapping an integer code to volts.
///
/// `gain` is in volts per code and must be positive (the devices this crate
/// targets are guaranteed monotonic); `offset` is in volts. A scale is
/// always replaced as a whole, never field-wise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearScale {
    gain: f64,
    offset: f64,
}

impl LinearScale {
    /// Create a scale from explicit coefficients.
    ///
    /// `gain` must be positive.
    pub fn new(gain: f64, offset: f64) -> Self {
        debug_assert!(gain > 0.0, "gain must be positive");
        Self { gain, offset }
    }

    /// Scale for a span `[min, max]` over a code width of `full_scale`:
    /// `gain = (max - min) / full_scale`, `offset = min`.
    pub fn from_span(min: f64, max: f64, full_scale: u32) -> Self {
        Self::new((max - min) / full_scale as f64, min)
    }

    /// Fit a scale through two measured points.
    ///
    /// The codes must differ; callers validate that before fitting.
    pub fn from_two_points(low_code: u32, low_volts: f64, high_code: u32, high_volts: f64) -> Self {
        let gain = (high_volts - low_volts) / (high_code as f64 - low_code as f64);
        let offset = low_volts - gain * low_code as f64;
        Self { gain, offset }
    }

    /// Volts per code.
    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Offset in volts.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Convert a device code to volts.
    pub fn code_to_volts(&self, code: u32) -> f64 {
        code as f64 * self.gain + self.offset
    }

    /// Convert volts to the nearest achievable device code.
    ///
    /// Floors `(volts - offset) / gain` and saturates to `[0, full_scale]`;
    /// never wraps and never fails.
    pub fn volts_to_code(&self, volts: f64, full_scale: u32) -> u32 {
        let raw = ((volts - self.offset) / self.gain).floor();
        if raw < 0.0 {
            0
        } else if raw > full_scale as f64 {
            full_scale
        } else {
            raw as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_SCALE: u32 = 65535;

    #[test]
    fn test_round_trip_within_one_code() {
        let scale = LinearScale::new(7.629_510_9e-5, 0.0);
        for code in [0u32, 1, 255, 32768, 65534, 65535] {
            let volts = scale.code_to_volts(code);
            let back = scale.volts_to_code(volts, FULL_SCALE);
            assert!(
                (back as i64 - code as i64).abs() <= 1,
                "code={code} back={back}"
            );
        }
    }

    #[test]
    fn test_round_trip_with_offset() {
        let scale = LinearScale::from_span(-10.0, 10.0, FULL_SCALE);
        for code in [0u32, 100, 32767, 65535] {
            let back = scale.volts_to_code(scale.code_to_volts(code), FULL_SCALE);
            assert!((back as i64 - code as i64).abs() <= 1);
        }
    }

    #[test]
    fn test_saturation() {
        let scale = LinearScale::from_span(0.0, 5.0, FULL_SCALE);
        assert_eq!(scale.volts_to_code(-100.0, FULL_SCALE), 0);
        assert_eq!(scale.volts_to_code(100.0, FULL_SCALE), FULL_SCALE);
    }

    #[test]
    fn test_from_span_endpoints() {
        let scale = LinearScale::from_span(-5.0, 5.0, FULL_SCALE);
        assert!((scale.code_to_volts(0) - (-5.0)).abs() < 1e-9);
        assert!((scale.code_to_volts(FULL_SCALE) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_from_two_points() {
        let scale = LinearScale::from_two_points(0x00FF, 0.1, 0xFF00, 4.9);
        let expected_gain = 4.8 / (0xFF00 as f64 - 0x00FF as f64);
        assert!((scale.gain() - expected_gain).abs() < 1e-12);
        assert!((scale.offset() - (0.1 - expected_gain * 255.0)).abs() < 1e-12);
        // The fit passes through both points.
        assert!((scale.code_to_volts(0x00FF) - 0.1).abs() < 1e-9);
        assert!((scale.code_to_volts(0xFF00) - 4.9).abs() < 1e-9);
    }

    #[test]
    fn test_serde_round_trip() {
        let scale = LinearScale::new(7.629_510_9e-5, 0.0125);
        let json = serde_json::to_string(&scale).unwrap();
        let back: LinearScale = serde_json::from_str(&json).unwrap();
        assert_eq!(back, scale);
    }
}
