//! Errors raised by the voice registry

use crate::synth::VoiceId;
use thiserror::Error;

/// Reasons a play request can be refused
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SynthError {
    #[error("frequency must be a positive, finite number of Hz (got {0})")]
    InvalidFrequency(f32),

    #[error("sample rate must be a positive, finite number of Hz (got {0})")]
    InvalidSampleRate(f32),

    #[error("wave length must be a positive, finite number of seconds (got {0})")]
    InvalidWaveLength(f32),

    #[error("voice limit of {limit} reached, cannot play voice {id}")]
    VoiceLimit { id: VoiceId, limit: usize },

    #[error("render command queue is full")]
    QueueFull,
}

/// Result alias for registry operations
pub type Result<T> = std::result::Result<T, SynthError>;

/// Check the parameters that would otherwise produce NaN or silent output
pub fn validate_timing(frequency: f32, sample_rate: f32, wave_length_secs: f32) -> Result<()> {
    if !(frequency.is_finite() && frequency > 0.0) {
        return Err(SynthError::InvalidFrequency(frequency));
    }
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(SynthError::InvalidSampleRate(sample_rate));
    }
    if !(wave_length_secs.is_finite() && wave_length_secs > 0.0) {
        return Err(SynthError::InvalidWaveLength(wave_length_secs));
    }
    Ok(())
}
