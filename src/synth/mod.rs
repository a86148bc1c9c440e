//! Waveform synthesis
//!
//! Contains the pure oscillator functions and the looping voice built on them.

pub mod oscillator;
mod voice;

pub use oscillator::{OscillatorFn, WaveformShape};
pub use voice::{
    written_channels, StereoMode, Voice, VoiceId, DEFAULT_SAMPLE_RATE, DEFAULT_VOICE_GAIN,
    DEFAULT_WAVE_LENGTH_SECS,
};
