//! Mix settings applied at the render boundary
//!
//! Voices are summed with a fixed per-voice gain and no normalisation, so a
//! crowd of loud voices can exceed full scale. The clip policy decides what
//! happens to the summed buffer before it reaches the device.

use crate::synth::{StereoMode, DEFAULT_VOICE_GAIN};
use serde::{Deserialize, Serialize};

/// What to do with samples outside [-1, 1] after mixing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipPolicy {
    /// Leave the sum untouched
    None,
    /// Brick-wall limit to [-1, 1]
    #[default]
    Clamp,
    /// `tanh` saturation, always inside (-1, 1)
    Soft,
}

impl ClipPolicy {
    /// Limit one sample
    #[inline]
    pub fn apply(self, sample: f32) -> f32 {
        match self {
            ClipPolicy::None => sample,
            ClipPolicy::Clamp => sample.clamp(-1.0, 1.0),
            ClipPolicy::Soft => sample.tanh(),
        }
    }

    /// Limit a whole buffer in place
    pub fn apply_buffer(self, buffer: &mut [f32]) {
        if self == ClipPolicy::None {
            return;
        }
        for sample in buffer.iter_mut() {
            *sample = self.apply(*sample);
        }
    }

    /// Limit only the first `limited` channels of each interleaved frame
    pub fn apply_channels(self, buffer: &mut [f32], channels: usize, limited: usize) {
        if self == ClipPolicy::None || channels == 0 || limited == 0 {
            return;
        }
        for frame in buffer.chunks_mut(channels) {
            let end = frame.len().min(limited);
            self.apply_buffer(&mut frame[..end]);
        }
    }
}

/// Gain, stereo and clipping settings shared by every voice in a registry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixSettings {
    /// Gain applied to each voice before its volume multiplier
    #[serde(default = "default_voice_gain")]
    pub voice_gain: f32,

    /// Limiting applied to the mixed buffer
    #[serde(default)]
    pub clip: ClipPolicy,

    /// How the right channel is derived
    #[serde(default)]
    pub stereo: StereoMode,
}

fn default_voice_gain() -> f32 { DEFAULT_VOICE_GAIN }

impl Default for MixSettings {
    fn default() -> Self {
        Self {
            voice_gain: DEFAULT_VOICE_GAIN,
            clip: ClipPolicy::default(),
            stereo: StereoMode::default(),
        }
    }
}

impl MixSettings {
    /// The unmodified mix: default gain, one-sample stereo offset, no limiting
    pub fn raw() -> Self {
        Self {
            clip: ClipPolicy::None,
            ..Self::default()
        }
    }

    pub fn with_gain(mut self, voice_gain: f32) -> Self {
        self.voice_gain = voice_gain;
        self
    }

    pub fn with_clip(mut self, clip: ClipPolicy) -> Self {
        self.clip = clip;
        self
    }

    pub fn with_stereo(mut self, stereo: StereoMode) -> Self {
        self.stereo = stereo;
        self
    }
}
