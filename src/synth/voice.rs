//! A single looping waveform voice

use super::oscillator::{OscillatorFn, WaveformShape};

/// Identifier the host assigns to a voice
pub type VoiceId = i32;

/// Default sample rate for new voices
pub const DEFAULT_SAMPLE_RATE: f32 = 44100.0;

/// Default wrap period in seconds
pub const DEFAULT_WAVE_LENGTH_SECS: f32 = 2.0;

/// Fixed per-voice gain that keeps a handful of overlapping voices below full scale
pub const DEFAULT_VOICE_GAIN: f32 = 0.02;

/// Leading channels of each frame a voice writes into.
///
/// Mono and multichannel buffers only receive channel 0; stereo buffers
/// receive channels 0 and 1.
pub fn written_channels(channels: usize) -> usize {
    match channels {
        0 => 0,
        2 => 2,
        _ => 1,
    }
}

/// How the second channel of a stereo frame is filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StereoMode {
    /// Right channel is evaluated one sample ahead of the left
    #[default]
    Offset,
    /// Right channel repeats the left sample
    Mirrored,
}

/// A looping oscillator with its own time index
#[derive(Debug, Clone)]
pub struct Voice {
    id: VoiceId,
    shape: WaveformShape,
    oscillator: OscillatorFn,
    frequency: f32,
    volume: i32,
    sample_rate: f32,
    wave_length_secs: f32,
    time_index: u32,
}

impl Voice {
    /// Create a voice at the default sample rate and wrap period
    pub fn new(shape: WaveformShape, frequency: f32, volume: i32, id: VoiceId) -> Self {
        Self::with_timing(
            shape,
            frequency,
            volume,
            id,
            DEFAULT_SAMPLE_RATE,
            DEFAULT_WAVE_LENGTH_SECS,
        )
    }

    /// Create a voice with an explicit sample rate and wrap period
    pub fn with_timing(
        shape: WaveformShape,
        frequency: f32,
        volume: i32,
        id: VoiceId,
        sample_rate: f32,
        wave_length_secs: f32,
    ) -> Self {
        Self {
            id,
            shape,
            oscillator: shape.oscillator(),
            frequency,
            volume,
            sample_rate,
            wave_length_secs,
            time_index: 0,
        }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn shape(&self) -> WaveformShape {
        self.shape
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn volume(&self) -> i32 {
        self.volume
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn wave_length_secs(&self) -> f32 {
        self.wave_length_secs
    }

    /// Current position of the sample counter
    pub fn time_index(&self) -> u32 {
        self.time_index
    }

    /// Number of samples after which the time index wraps to 0
    pub fn wrap_period(&self) -> f32 {
        self.sample_rate * self.wave_length_secs
    }

    /// Restart the waveform from index 0
    pub fn retrigger(&mut self) {
        self.time_index = 0;
    }

    /// Add this voice into an interleaved buffer using the default gain and stereo mode
    pub fn render(&mut self, buffer: &mut [f32], channels: usize) {
        self.render_into(buffer, channels, DEFAULT_VOICE_GAIN, StereoMode::Offset);
    }

    /// Add this voice into an interleaved buffer.
    ///
    /// Samples are summed onto whatever the buffer already holds. Channel 0 is
    /// always written; channel 1 only for stereo buffers. See [`written_channels`].
    pub fn render_into(
        &mut self,
        buffer: &mut [f32],
        channels: usize,
        gain: f32,
        stereo: StereoMode,
    ) {
        if channels == 0 {
            return;
        }

        let scale = gain * self.volume as f32;
        let wrap = self.wrap_period();

        for frame in buffer.chunks_mut(channels) {
            let left = (self.oscillator)(self.time_index, self.frequency, self.sample_rate) * scale;
            frame[0] += left;
            self.time_index = self.time_index.wrapping_add(1);

            if channels == 2 {
                if let Some(right_slot) = frame.get_mut(1) {
                    *right_slot += match stereo {
                        StereoMode::Offset => {
                            (self.oscillator)(self.time_index, self.frequency, self.sample_rate)
                                * scale
                        }
                        StereoMode::Mirrored => left,
                    };
                }
            }

            if self.time_index as f32 >= wrap {
                self.time_index = 0;
            }
        }
    }
}
