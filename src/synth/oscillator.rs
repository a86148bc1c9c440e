//! Pure oscillator functions
//!
//! Every oscillator maps a sample index, a frequency and a sample rate to a
//! single sample. There is no hidden phase state here; the caller owns the
//! time index.

use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use std::fmt;
use std::str::FromStr;

/// Signature shared by all oscillators: `(time_index, frequency, sample_rate) -> sample`
pub type OscillatorFn = fn(u32, f32, f32) -> f32;

/// Waveform shapes a voice can play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveformShape {
    #[default]
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

/// Indexed by `WaveformShape as usize`
const OSCILLATORS: [OscillatorFn; 4] = [sine, square, triangle, sawtooth];

impl WaveformShape {
    /// All shapes in index order
    pub const ALL: [WaveformShape; 4] = [
        WaveformShape::Sine,
        WaveformShape::Square,
        WaveformShape::Triangle,
        WaveformShape::Sawtooth,
    ];

    /// The oscillator function for this shape
    pub fn oscillator(self) -> OscillatorFn {
        OSCILLATORS[self as usize]
    }

    /// Evaluate this shape at a time index
    pub fn sample(self, time_index: u32, frequency: f32, sample_rate: f32) -> f32 {
        self.oscillator()(time_index, frequency, sample_rate)
    }

    /// Map a host-side shape index to a shape.
    ///
    /// Unknown indices play as a sine.
    pub fn from_index(index: i32) -> Self {
        match index {
            1 => WaveformShape::Square,
            2 => WaveformShape::Triangle,
            3 => WaveformShape::Sawtooth,
            _ => WaveformShape::Sine,
        }
    }

    /// Look up a shape by name, returning `None` for unknown names
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "sine" | "sin" => Some(WaveformShape::Sine),
            "square" | "sqr" => Some(WaveformShape::Square),
            "triangle" | "tri" => Some(WaveformShape::Triangle),
            "sawtooth" | "saw" => Some(WaveformShape::Sawtooth),
            _ => None,
        }
    }

    /// Lowercase name of the shape
    pub fn name(self) -> &'static str {
        match self {
            WaveformShape::Sine => "sine",
            WaveformShape::Square => "square",
            WaveformShape::Triangle => "triangle",
            WaveformShape::Sawtooth => "sawtooth",
        }
    }
}

impl From<i32> for WaveformShape {
    fn from(index: i32) -> Self {
        Self::from_index(index)
    }
}

/// Parsing never fails: unrecognised names fall back to [`WaveformShape::Sine`].
impl FromStr for WaveformShape {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s).unwrap_or_default())
    }
}

impl fmt::Display for WaveformShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Normalised position in the waveform, one unit per period
#[inline]
fn cycles(time_index: u32, frequency: f32, sample_rate: f32) -> f32 {
    time_index as f32 * frequency / sample_rate
}

/// `sin(2π · n · f / sr)`
#[inline]
pub fn sine(time_index: u32, frequency: f32, sample_rate: f32) -> f32 {
    (TAU * time_index as f32 * frequency / sample_rate).sin()
}

/// Sign of the sine: exactly -1, 0 or 1
#[inline]
pub fn square(time_index: u32, frequency: f32, sample_rate: f32) -> f32 {
    let s = sine(time_index, frequency, sample_rate);
    if s > 0.0 {
        1.0
    } else if s < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Triangle with period 1 in `t`, peaking at `t = 0.25`
#[inline]
pub fn triangle(time_index: u32, frequency: f32, sample_rate: f32) -> f32 {
    let shifted = cycles(time_index, frequency, sample_rate) - 0.25;
    1.0 - 4.0 * (shifted.round() - shifted).abs()
}

/// Ramp from -1 to 1 with period 1 in `t`
#[inline]
pub fn sawtooth(time_index: u32, frequency: f32, sample_rate: f32) -> f32 {
    let t = cycles(time_index, frequency, sample_rate);
    2.0 * (t - (t + 0.5).floor())
}
