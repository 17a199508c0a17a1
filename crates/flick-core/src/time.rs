//! Frame rate representation.
//!
//! The container header stores the rate as an 8.8 fixed-point value, so
//! the rational form uses a denominator of 256 for header-derived rates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Frame rate as a rational number of frames per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    /// Numerator (e.g. 24)
    pub numerator: u32,
    /// Denominator (e.g. 1)
    pub denominator: u32,
}

impl FrameRate {
    /// Create a new frame rate.
    #[inline]
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Decode the container's 8.8 fixed-point rate field.
    ///
    /// The raw header value is frames-per-second multiplied by 256, so
    /// `0x1800` is 24 fps and `0x0C80` is 12.5 fps.
    #[inline]
    pub const fn from_fixed_8_8(raw: u16) -> Self {
        Self {
            numerator: raw as u32,
            denominator: 256,
        }
    }

    /// Convert to frames per second as f64.
    #[inline]
    pub fn to_fps_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// Duration of a single frame.
    ///
    /// A zero rate yields a zero duration; callers must not schedule
    /// ticks from an unpublished rate.
    pub fn frame_duration(self) -> Duration {
        if self.numerator == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.denominator as f64 / self.numerator as f64)
    }

    /// Whether the rate denotes any playable pacing at all.
    #[inline]
    pub fn is_zero(self) -> bool {
        self.numerator == 0
    }

    /// Common frame rates
    pub const FPS_24: Self = Self::new(24, 1);
    pub const FPS_60: Self = Self::new(60, 1);
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::FPS_24
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fps = self.to_fps_f64();
        if (fps - fps.round()).abs() < 0.001 {
            write!(f, "{} fps", fps.round() as u32)
        } else {
            write!(f, "{:.3} fps", fps)
        }
    }
}
