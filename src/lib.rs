//! chiptone - procedural waveform voices for real-time audio
//!
//! A handful of pure oscillators (sine, square, triangle, sawtooth) wrapped in
//! looping voices. Game or UI code starts and stops voices by id through a
//! [`VoiceRegistry`]; the audio callback sums every live voice into its
//! buffer through the paired [`Renderer`].

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod synth;

pub use config::ChiptoneConfig;
pub use engine::{PlayCounter, RegistrySettings, Renderer, VoiceEvents, VoiceRegistry};
pub use error::SynthError;
pub use synth::{Voice, VoiceId, WaveformShape};
