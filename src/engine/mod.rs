//! Voice registry and real-time renderer
//!
//! The registry is split in two halves joined by a single-producer,
//! single-consumer command queue:
//! - [`VoiceRegistry`] lives with the game/UI logic and takes play, stop,
//!   retrigger and reset requests.
//! - [`Renderer`] lives in the audio callback and owns the voices. It drains
//!   pending commands at the start of every block, then sums all voices into
//!   the host buffer.
//!
//! The renderer's voice list is allocated up front and the registry refuses
//! to exceed it, so the audio side never allocates or locks.

mod events;
mod mixer;
mod player;
mod recorder;
mod timeline;

pub use events::{NoEvents, PlayCounter, VoiceEvents};
pub use mixer::{ClipPolicy, MixSettings};
pub use player::{default_device_name, list_output_devices, Player};
pub use recorder::Recorder;
pub use timeline::{Cue, CueAction, Timeline};

use crate::config::ChiptoneConfig;
use crate::error::{validate_timing, Result, SynthError};
use crate::synth::{
    written_channels, Voice, VoiceId, WaveformShape, DEFAULT_SAMPLE_RATE,
    DEFAULT_WAVE_LENGTH_SECS,
};
use log::debug;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::Arc;

/// Default upper bound on simultaneously active voices
pub const DEFAULT_MAX_VOICES: usize = 64;

/// Default number of commands that can wait for the next render
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Settings fixed for the lifetime of a registry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegistrySettings {
    /// Sample rate new voices are created with
    pub sample_rate: f32,
    /// Wrap period of new voices, in seconds
    pub wave_length_secs: f32,
    /// Maximum number of voices alive at once
    pub max_voices: usize,
    /// Capacity of the command queue
    pub queue_capacity: usize,
    /// Gain, stereo and clipping
    pub mix: MixSettings,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            wave_length_secs: DEFAULT_WAVE_LENGTH_SECS,
            max_voices: DEFAULT_MAX_VOICES,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            mix: MixSettings::default(),
        }
    }
}

impl RegistrySettings {
    /// Build settings from a loaded configuration
    pub fn from_config(config: &ChiptoneConfig) -> Self {
        Self {
            sample_rate: config.audio.sample_rate as f32,
            wave_length_secs: config.audio.wave_length_secs,
            max_voices: config.mixer.max_voices,
            queue_capacity: DEFAULT_QUEUE_CAPACITY.max(config.mixer.max_voices * 2),
            mix: config.mixer.mix_settings(),
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_wave_length(mut self, wave_length_secs: f32) -> Self {
        self.wave_length_secs = wave_length_secs;
        self
    }

    pub fn with_max_voices(mut self, max_voices: usize) -> Self {
        self.max_voices = max_voices;
        self
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn with_mix(mut self, mix: MixSettings) -> Self {
        self.mix = mix;
        self
    }
}

/// Requests travelling from the registry to the renderer
#[derive(Debug)]
enum Command {
    Play(Voice),
    Stop(VoiceId),
    Retrigger(VoiceId),
    Reset,
}

/// Control half of the voice registry
pub struct VoiceRegistry {
    commands: HeapProd<Command>,
    /// Ids of live voices, in play order, as the renderer will see them
    active: Vec<VoiceId>,
    settings: RegistrySettings,
    events: Arc<dyn VoiceEvents>,
}

impl VoiceRegistry {
    /// Create a registry and its renderer with no event listener
    pub fn new(settings: RegistrySettings) -> (Self, Renderer) {
        Self::with_events(settings, Arc::new(NoEvents))
    }

    /// Create a registry and its renderer, reporting lifecycle events to `events`
    pub fn with_events(settings: RegistrySettings, events: Arc<dyn VoiceEvents>) -> (Self, Renderer) {
        let max_voices = settings.max_voices.max(1);
        let ring = HeapRb::<Command>::new(settings.queue_capacity.max(1));
        let (producer, consumer) = ring.split();

        let registry = Self {
            commands: producer,
            active: Vec::with_capacity(max_voices),
            settings: RegistrySettings { max_voices, ..settings },
            events,
        };
        let renderer = Renderer {
            commands: consumer,
            voices: Vec::with_capacity(max_voices),
            mix: settings.mix,
        };

        (registry, renderer)
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    /// Start a new looping voice.
    ///
    /// Duplicate ids are allowed; both voices sound until stopped.
    pub fn play(
        &mut self,
        shape: WaveformShape,
        frequency: f32,
        volume: i32,
        id: VoiceId,
    ) -> Result<()> {
        validate_timing(frequency, self.settings.sample_rate, self.settings.wave_length_secs)?;

        if self.active.len() >= self.settings.max_voices {
            return Err(SynthError::VoiceLimit {
                id,
                limit: self.settings.max_voices,
            });
        }

        let voice = Voice::with_timing(
            shape,
            frequency,
            volume,
            id,
            self.settings.sample_rate,
            self.settings.wave_length_secs,
        );
        self.send(Command::Play(voice))?;

        self.active.push(id);
        self.events.voice_started(id);
        debug!("play voice {id}: {shape} {frequency} Hz x{volume}");
        Ok(())
    }

    /// Stop and remove every voice with this id, returning how many were removed.
    ///
    /// Unknown ids are a no-op.
    pub fn stop(&mut self, id: VoiceId) -> Result<usize> {
        let matches = self.count(id);
        if matches == 0 {
            return Ok(0);
        }

        self.send(Command::Stop(id))?;

        self.active.retain(|&active| active != id);
        for _ in 0..matches {
            self.events.voice_stopped(id);
        }
        debug!("stop voice {id} ({matches} removed)");
        Ok(matches)
    }

    /// Restart every voice with this id from the beginning of its waveform
    pub fn retrigger(&mut self, id: VoiceId) -> Result<usize> {
        let matches = self.count(id);
        if matches == 0 {
            return Ok(0);
        }

        self.send(Command::Retrigger(id))?;

        for _ in 0..matches {
            self.events.voice_retriggered(id);
        }
        Ok(matches)
    }

    /// Drop every voice
    pub fn reset(&mut self) -> Result<()> {
        self.send(Command::Reset)?;
        self.active.clear();
        self.events.voices_cleared();
        debug!("voice registry reset");
        Ok(())
    }

    /// Number of live voices
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Check whether any voice has this id
    pub fn is_active(&self, id: VoiceId) -> bool {
        self.active.contains(&id)
    }

    /// Ids of live voices in play order
    pub fn active_ids(&self) -> &[VoiceId] {
        &self.active
    }

    fn count(&self, id: VoiceId) -> usize {
        self.active.iter().filter(|&&active| active == id).count()
    }

    fn send(&mut self, command: Command) -> Result<()> {
        self.commands
            .try_push(command)
            .map_err(|_| SynthError::QueueFull)
    }
}

/// Audio half of the voice registry
pub struct Renderer {
    commands: HeapCons<Command>,
    voices: Vec<Voice>,
    mix: MixSettings,
}

impl Renderer {
    /// Add every active voice into an interleaved buffer.
    ///
    /// The buffer is summed into, not overwritten. Only the channels voices
    /// write (see [`written_channels`]) are clipped; the rest of each frame is
    /// never touched. With no active voices the buffer is left exactly as it
    /// was, clipping included.
    pub fn render(&mut self, buffer: &mut [f32], channels: usize) {
        self.apply_pending();

        if self.voices.is_empty() || channels == 0 {
            return;
        }

        for voice in self.voices.iter_mut() {
            voice.render_into(buffer, channels, self.mix.voice_gain, self.mix.stereo);
        }

        self.mix
            .clip
            .apply_channels(buffer, channels, written_channels(channels));
    }

    /// Apply queued commands without rendering, returning how many were applied
    pub fn apply_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Some(command) = self.commands.try_pop() {
            match command {
                Command::Play(voice) => {
                    // The registry enforces the limit, so this never grows the list
                    if self.voices.len() < self.voices.capacity() {
                        self.voices.push(voice);
                    }
                }
                Command::Stop(id) => self.voices.retain(|voice| voice.id() != id),
                Command::Retrigger(id) => {
                    for voice in self.voices.iter_mut().filter(|voice| voice.id() == id) {
                        voice.retrigger();
                    }
                }
                Command::Reset => self.voices.clear(),
            }
            applied += 1;
        }
        applied
    }

    /// Number of voices the next render will play
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Voices in play order
    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn mix(&self) -> &MixSettings {
        &self.mix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::oscillator::sine;

    fn registry() -> (VoiceRegistry, Renderer) {
        VoiceRegistry::new(RegistrySettings::default())
    }

    #[test]
    fn test_play_adds_voice() {
        let (mut registry, mut renderer) = registry();
        registry.play(WaveformShape::Sine, 440.0, 1, 1).unwrap();

        assert_eq!(registry.active_count(), 1);
        assert!(registry.is_active(1));

        assert_eq!(renderer.apply_pending(), 1);
        assert_eq!(renderer.voice_count(), 1);
        assert_eq!(renderer.voices()[0].id(), 1);
    }

    #[test]
    fn test_play_rejects_bad_frequency() {
        let (mut registry, mut renderer) = registry();
        let err = registry.play(WaveformShape::Sine, 0.0, 1, 1).unwrap_err();

        assert_eq!(err, SynthError::InvalidFrequency(0.0));
        assert_eq!(registry.active_count(), 0);
        assert_eq!(renderer.apply_pending(), 0);
    }

    #[test]
    fn test_bad_sample_rate_rejected_at_play() {
        let settings = RegistrySettings::default().with_sample_rate(0.0);
        let (mut registry, _renderer) = VoiceRegistry::new(settings);
        assert_eq!(
            registry.play(WaveformShape::Square, 440.0, 1, 1),
            Err(SynthError::InvalidSampleRate(0.0))
        );
    }

    #[test]
    fn test_stop_removes_all_duplicates() {
        let (mut registry, mut renderer) = registry();
        registry.play(WaveformShape::Sine, 440.0, 1, 5).unwrap();
        registry.play(WaveformShape::Square, 220.0, 1, 5).unwrap();
        registry.play(WaveformShape::Triangle, 330.0, 1, 6).unwrap();

        assert_eq!(registry.stop(5).unwrap(), 2);
        assert_eq!(registry.active_ids(), &[6]);

        renderer.apply_pending();
        assert_eq!(renderer.voice_count(), 1);
        assert_eq!(renderer.voices()[0].id(), 6);
    }

    #[test]
    fn test_stop_unknown_id_is_noop() {
        let (mut registry, mut renderer) = registry();
        registry.play(WaveformShape::Sine, 440.0, 1, 1).unwrap();

        assert_eq!(registry.stop(99).unwrap(), 0);
        assert_eq!(registry.active_count(), 1);
        // Only the play command was queued
        assert_eq!(renderer.apply_pending(), 1);
    }

    #[test]
    fn test_voice_limit() {
        let settings = RegistrySettings::default().with_max_voices(2);
        let (mut registry, mut renderer) = VoiceRegistry::new(settings);

        registry.play(WaveformShape::Sine, 440.0, 1, 1).unwrap();
        registry.play(WaveformShape::Sine, 440.0, 1, 2).unwrap();
        assert_eq!(
            registry.play(WaveformShape::Sine, 440.0, 1, 3),
            Err(SynthError::VoiceLimit { id: 3, limit: 2 })
        );

        // Room frees up once a voice is stopped
        registry.stop(1).unwrap();
        registry.play(WaveformShape::Sine, 440.0, 1, 3).unwrap();

        renderer.apply_pending();
        assert_eq!(renderer.voice_count(), 2);
    }

    #[test]
    fn test_queue_full() {
        let settings = RegistrySettings::default().with_queue_capacity(2);
        let (mut registry, mut renderer) = VoiceRegistry::new(settings);

        registry.play(WaveformShape::Sine, 440.0, 1, 1).unwrap();
        registry.play(WaveformShape::Sine, 440.0, 1, 2).unwrap();
        assert_eq!(
            registry.play(WaveformShape::Sine, 440.0, 1, 3),
            Err(SynthError::QueueFull)
        );
        assert_eq!(registry.active_count(), 2);

        // Rendering drains the queue
        renderer.render(&mut [0.0; 16], 1);
        registry.play(WaveformShape::Sine, 440.0, 1, 3).unwrap();
    }

    #[test]
    fn test_render_empty_leaves_buffer() {
        let (_registry, mut renderer) = registry();
        let mut buffer = vec![3.0f32; 32];
        renderer.render(&mut buffer, 2);
        // Not even clipped
        assert!(buffer.iter().all(|&s| s == 3.0));
    }

    #[test]
    fn test_render_matches_voice_formula() {
        let (mut registry, mut renderer) = registry();
        registry.play(WaveformShape::Sine, 440.0, 2, 1).unwrap();

        let mut buffer = vec![0.0f32; 128];
        renderer.render(&mut buffer, 1);

        for (n, &sample) in buffer.iter().enumerate() {
            let expected = sine(n as u32, 440.0, 44100.0) * (0.02 * 2.0);
            assert!((sample - expected).abs() < 1e-7);
        }
    }

    #[test]
    fn test_render_clamps_overlapping_voices() {
        let settings = RegistrySettings::default().with_mix(MixSettings::default().with_gain(1.0));
        let (mut registry, mut renderer) = VoiceRegistry::new(settings);
        for id in 0..4 {
            registry.play(WaveformShape::Square, 100.0, 1, id).unwrap();
        }

        let mut buffer = vec![0.0f32; 1024];
        renderer.render(&mut buffer, 1);
        assert!(buffer.iter().all(|&s| (-1.0..=1.0).contains(&s)));
        assert!(buffer.iter().any(|&s| s == 1.0));
    }

    #[test]
    fn test_clip_leaves_unwritten_channels() {
        let (mut registry, mut renderer) = registry();
        registry.play(WaveformShape::Sine, 440.0, 1, 1).unwrap();

        let mut buffer = vec![5.0f32; 4 * 8];
        renderer.render(&mut buffer, 4);

        for frame in buffer.chunks(4) {
            // Channel 0 holds 5.0 plus the voice, clamped to full scale
            assert_eq!(frame[0], 1.0);
            assert_eq!(&frame[1..], &[5.0f32, 5.0, 5.0]);
        }
    }

    #[test]
    fn test_clip_covers_both_stereo_channels() {
        let (mut registry, mut renderer) = registry();
        registry.play(WaveformShape::Sine, 440.0, 1, 1).unwrap();

        let mut buffer = vec![5.0f32; 2 * 8];
        renderer.render(&mut buffer, 2);
        assert!(buffer.iter().all(|&s| s == 1.0));
    }

    #[test]
    fn test_raw_mix_can_exceed_full_scale() {
        let settings =
            RegistrySettings::default().with_mix(MixSettings::raw().with_gain(1.0));
        let (mut registry, mut renderer) = VoiceRegistry::new(settings);
        for id in 0..4 {
            registry.play(WaveformShape::Square, 100.0, 1, id).unwrap();
        }

        let mut buffer = vec![0.0f32; 1024];
        renderer.render(&mut buffer, 1);
        assert!(buffer.iter().any(|&s| s == 4.0));
    }

    #[test]
    fn test_retrigger_resets_phase() {
        let (mut registry, mut renderer) = registry();
        registry.play(WaveformShape::Triangle, 440.0, 1, 1).unwrap();
        renderer.render(&mut vec![0.0f32; 100], 1);
        assert_eq!(renderer.voices()[0].time_index(), 100);

        assert_eq!(registry.retrigger(1).unwrap(), 1);
        assert_eq!(registry.retrigger(2).unwrap(), 0);
        renderer.apply_pending();
        assert_eq!(renderer.voices()[0].time_index(), 0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let (mut registry, mut renderer) = registry();
        registry.play(WaveformShape::Sine, 440.0, 1, 1).unwrap();
        registry.play(WaveformShape::Sawtooth, 440.0, 1, 2).unwrap();
        renderer.apply_pending();

        registry.reset().unwrap();
        registry.reset().unwrap();
        assert_eq!(registry.active_count(), 0);

        renderer.apply_pending();
        assert_eq!(renderer.voice_count(), 0);
    }

    #[test]
    fn test_events_reported() {
        let counter = Arc::new(PlayCounter::new());
        let (mut registry, _renderer) =
            VoiceRegistry::with_events(RegistrySettings::default(), counter.clone());

        registry.play(WaveformShape::Sine, 440.0, 1, 1).unwrap();
        registry.play(WaveformShape::Sine, 440.0, 1, 2).unwrap();
        assert_eq!(counter.playing(), 2);

        registry.stop(1).unwrap();
        assert_eq!(counter.playing(), 1);

        // Failed play does not count
        let _ = registry.play(WaveformShape::Sine, -1.0, 1, 3);
        assert_eq!(counter.playing(), 1);

        registry.reset().unwrap();
        assert!(counter.is_idle());
    }

    #[test]
    fn test_settings_from_config() {
        let config = ChiptoneConfig::default();
        let settings = RegistrySettings::from_config(&config);
        assert_eq!(settings.sample_rate, 44100.0);
        assert_eq!(settings.wave_length_secs, 2.0);
        assert_eq!(settings.max_voices, 64);
        assert_eq!(settings.mix, MixSettings::default());
    }
}
