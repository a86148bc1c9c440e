//! Configuration schema definitions

use crate::engine::{ClipPolicy, MixSettings};
use crate::synth::{StereoMode, VoiceId, WaveformShape, DEFAULT_VOICE_GAIN};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Main configuration for chiptone
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChiptoneConfig {
    /// Audio output settings
    #[serde(default)]
    pub audio: AudioConfig,

    /// Gain, clipping and voice limits
    #[serde(default)]
    pub mixer: MixerConfig,

    /// Voices to play, with their start and stop times
    #[serde(default)]
    pub voices: Vec<VoiceConfig>,
}

impl ChiptoneConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Validate audio settings
        if self.audio.sample_rate < 8000 || self.audio.sample_rate > 192000 {
            bail!("Sample rate must be between 8000 and 192000");
        }
        if self.audio.channels == 0 || self.audio.channels > 8 {
            bail!("Channel count must be between 1 and 8");
        }
        if self.audio.buffer_size < 64 || self.audio.buffer_size > 8192 {
            bail!("Buffer size must be between 64 and 8192");
        }
        if !(self.audio.wave_length_secs.is_finite() && self.audio.wave_length_secs > 0.0) {
            bail!("Wave length must be a positive number of seconds");
        }

        // Validate mixer settings
        if !(0.0..=1.0).contains(&self.mixer.voice_gain) {
            bail!("Voice gain must be between 0.0 and 1.0");
        }
        if self.mixer.max_voices == 0 || self.mixer.max_voices > 1024 {
            bail!("Max voices must be between 1 and 1024");
        }

        // Validate voices
        let mut seen = HashSet::new();
        for voice in &self.voices {
            if !(voice.frequency.is_finite() && voice.frequency > 0.0) {
                bail!("Voice {} has invalid frequency {}", voice.id, voice.frequency);
            }
            if !(voice.start.is_finite() && voice.start >= 0.0) {
                bail!("Voice {} has invalid start time {}", voice.id, voice.start);
            }
            if let Some(stop) = voice.stop {
                if !(stop.is_finite() && stop > voice.start) {
                    bail!("Voice {} must stop after it starts", voice.id);
                }
            }
            if !seen.insert(voice.id) {
                bail!("Voice id {} is used more than once", voice.id);
            }
        }

        Ok(())
    }
}

/// Audio output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate in Hz (default: 44100)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Interleaved channels for recordings (default: 2)
    #[serde(default = "default_channels")]
    pub channels: u16,

    /// Buffer size in frames (default: 512)
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Output device name (None = default device)
    pub device: Option<String>,

    /// Seconds after which a voice's time index wraps (default: 2.0)
    #[serde(default = "default_wave_length")]
    pub wave_length_secs: f32,
}

fn default_sample_rate() -> u32 { 44100 }
fn default_channels() -> u16 { 2 }
fn default_buffer_size() -> usize { 512 }
fn default_wave_length() -> f32 { 2.0 }

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            buffer_size: default_buffer_size(),
            device: None,
            wave_length_secs: default_wave_length(),
        }
    }
}

/// Mixer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixerConfig {
    /// Gain applied to every voice (default: 0.02)
    #[serde(default = "default_voice_gain")]
    pub voice_gain: f32,

    /// Limiting applied after summing (default: clamp)
    #[serde(default)]
    pub clip: ClipPolicy,

    /// Right channel derivation (default: offset)
    #[serde(default)]
    pub stereo: StereoMode,

    /// Maximum simultaneous voices (default: 64)
    #[serde(default = "default_max_voices")]
    pub max_voices: usize,
}

fn default_voice_gain() -> f32 { DEFAULT_VOICE_GAIN }
fn default_max_voices() -> usize { 64 }

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            voice_gain: default_voice_gain(),
            clip: ClipPolicy::default(),
            stereo: StereoMode::default(),
            max_voices: default_max_voices(),
        }
    }
}

impl MixerConfig {
    /// Render-time settings for the registry
    pub fn mix_settings(&self) -> MixSettings {
        MixSettings::default()
            .with_gain(self.voice_gain)
            .with_clip(self.clip)
            .with_stereo(self.stereo)
    }
}

/// A voice to play
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Identifier used to stop the voice
    pub id: VoiceId,

    /// Waveform shape
    #[serde(default)]
    pub shape: WaveformShape,

    /// Frequency in Hz
    pub frequency: f32,

    /// Volume multiplier (default: 1)
    #[serde(default = "default_volume")]
    pub volume: i32,

    /// Start time in seconds (default: 0)
    #[serde(default)]
    pub start: f32,

    /// Stop time in seconds (None = play until the end)
    pub stop: Option<f32>,
}

fn default_volume() -> i32 { 1 }

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(id: VoiceId, start: f32, stop: Option<f32>) -> VoiceConfig {
        VoiceConfig {
            id,
            shape: WaveformShape::Square,
            frequency: 440.0,
            volume: 1,
            start,
            stop,
        }
    }

    #[test]
    fn test_default_audio_config() {
        let yaml = "sample_rate: 48000";
        let config: AudioConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.buffer_size, 512); // default
        assert_eq!(config.channels, 2);
        assert_eq!(config.wave_length_secs, 2.0);
    }

    #[test]
    fn test_mixer_config() {
        let yaml = r#"
voice_gain: 0.1
clip: soft
stereo: mirrored
max_voices: 8
"#;
        let config: MixerConfig = serde_yaml::from_str(yaml).unwrap();
        let mix = config.mix_settings();
        assert_eq!(mix.voice_gain, 0.1);
        assert_eq!(mix.clip, ClipPolicy::Soft);
        assert_eq!(mix.stereo, StereoMode::Mirrored);
        assert_eq!(config.max_voices, 8);
    }

    #[test]
    fn test_voice_config() {
        let yaml = r#"
id: 3
shape: sawtooth
frequency: 110
stop: 2.5
"#;
        let config: VoiceConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.id, 3);
        assert_eq!(config.shape, WaveformShape::Sawtooth);
        assert_eq!(config.frequency, 110.0);
        assert_eq!(config.volume, 1);
        assert_eq!(config.start, 0.0);
        assert_eq!(config.stop, Some(2.5));
    }

    #[test]
    fn test_config_validation() {
        let config = ChiptoneConfig {
            voices: vec![voice(1, 0.0, Some(1.0)), voice(2, 0.5, None)],
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_sample_rate() {
        let mut config = ChiptoneConfig::default();
        config.audio.sample_rate = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_voice_gain() {
        let mut config = ChiptoneConfig::default();
        config.mixer.voice_gain = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_stop_before_start() {
        let config = ChiptoneConfig {
            voices: vec![voice(1, 2.0, Some(1.0))],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Voice 1"));
    }

    #[test]
    fn test_duplicate_voice_ids() {
        let config = ChiptoneConfig {
            voices: vec![voice(4, 0.0, None), voice(4, 1.0, None)],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_frequency_rejected() {
        let mut bad = voice(1, 0.0, None);
        bad.frequency = 0.0;
        let config = ChiptoneConfig {
            voices: vec![bad],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
