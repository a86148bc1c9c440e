//! Time-ordered play and stop cues
//!
//! A timeline stands in for the game logic that normally drives the
//! registry: it fires play and stop requests once their time has come,
//! either against a wall clock or against a frame counter when rendering
//! offline.

use super::{Renderer, VoiceRegistry};
use crate::config::VoiceConfig;
use crate::error::SynthError;
use crate::synth::{VoiceId, WaveformShape};
use anyhow::Result;
use log::warn;

/// What a cue does when it fires
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CueAction {
    Play {
        shape: WaveformShape,
        frequency: f32,
        volume: i32,
        id: VoiceId,
    },
    Stop {
        id: VoiceId,
    },
}

impl CueAction {
    // Stops sort ahead of plays at the same instant so a freed slot can be reused
    fn rank(&self) -> u8 {
        match self {
            CueAction::Stop { .. } => 0,
            CueAction::Play { .. } => 1,
        }
    }
}

/// A single scheduled request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cue {
    /// Seconds from the start of the timeline
    pub at_secs: f64,
    pub action: CueAction,
}

impl Cue {
    pub fn play(at_secs: f64, shape: WaveformShape, frequency: f32, volume: i32, id: VoiceId) -> Self {
        Self {
            at_secs,
            action: CueAction::Play {
                shape,
                frequency,
                volume,
                id,
            },
        }
    }

    pub fn stop(at_secs: f64, id: VoiceId) -> Self {
        Self {
            at_secs,
            action: CueAction::Stop { id },
        }
    }

    /// Send this cue to the registry
    pub fn fire(&self, registry: &mut VoiceRegistry) -> std::result::Result<(), SynthError> {
        match self.action {
            CueAction::Play {
                shape,
                frequency,
                volume,
                id,
            } => registry.play(shape, frequency, volume, id),
            CueAction::Stop { id } => registry.stop(id).map(|_| ()),
        }
    }
}

/// Cues sorted by time, consumed front to back
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    cues: Vec<Cue>,
    next: usize,
}

impl Timeline {
    /// Build a timeline from unordered cues
    pub fn new(mut cues: Vec<Cue>) -> Self {
        cues.sort_by(|a, b| {
            a.at_secs
                .total_cmp(&b.at_secs)
                .then(a.action.rank().cmp(&b.action.rank()))
        });
        Self { cues, next: 0 }
    }

    /// One play cue per configured voice, plus a stop cue where a stop time is given
    pub fn from_voices(voices: &[VoiceConfig]) -> Self {
        let mut cues = Vec::with_capacity(voices.len() * 2);
        for voice in voices {
            cues.push(Cue::play(
                voice.start as f64,
                voice.shape,
                voice.frequency,
                voice.volume,
                voice.id,
            ));
            if let Some(stop) = voice.stop {
                cues.push(Cue::stop(stop as f64, voice.id));
            }
        }
        Self::new(cues)
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// True once every cue has fired
    pub fn is_finished(&self) -> bool {
        self.next >= self.cues.len()
    }

    /// Time of the next cue to fire
    pub fn next_cue_secs(&self) -> Option<f64> {
        self.cues.get(self.next).map(|cue| cue.at_secs)
    }

    /// Time of the last cue
    pub fn end_secs(&self) -> Option<f64> {
        self.cues.last().map(|cue| cue.at_secs)
    }

    /// Rewind to the first cue
    pub fn rewind(&mut self) {
        self.next = 0;
    }

    /// Fire every cue due at or before `now_secs`, returning how many fired.
    ///
    /// A cue the registry refuses is still consumed; the error is returned
    /// after the remaining due cues have fired.
    pub fn fire_due(
        &mut self,
        registry: &mut VoiceRegistry,
        now_secs: f64,
    ) -> std::result::Result<usize, SynthError> {
        let mut fired = 0;
        let mut first_error = None;

        while let Some(cue) = self.cues.get(self.next) {
            if cue.at_secs > now_secs {
                break;
            }
            self.next += 1;
            match cue.fire(registry) {
                Ok(()) => fired += 1,
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(fired),
        }
    }

    /// Render `total_frames` frames offline, firing cues on the exact frame they fall on.
    ///
    /// Each rendered block is zeroed first and handed to `sink`. Refused cues
    /// are logged and skipped.
    pub fn render_offline<F>(
        &mut self,
        registry: &mut VoiceRegistry,
        renderer: &mut Renderer,
        channels: usize,
        total_frames: usize,
        block_frames: usize,
        mut sink: F,
    ) -> Result<()>
    where
        F: FnMut(&[f32]) -> Result<()>,
    {
        let channels = channels.max(1);
        let block_frames = block_frames.max(1);
        let sample_rate = registry.settings().sample_rate as f64;
        let mut block = vec![0.0f32; block_frames * channels];
        let mut frame = 0usize;

        while frame < total_frames {
            if let Err(e) = self.fire_due(registry, frame as f64 / sample_rate) {
                warn!("cue refused at frame {frame}: {e}");
            }

            let next_cue_frame = self
                .next_cue_secs()
                .map(|secs| (secs * sample_rate).ceil() as usize)
                .unwrap_or(usize::MAX);
            let end = (frame + block_frames)
                .min(total_frames)
                .min(next_cue_frame.max(frame + 1));

            let samples = &mut block[..(end - frame) * channels];
            samples.fill(0.0);
            renderer.render(samples, channels);
            sink(samples)?;

            frame = end;
        }

        Ok(())
    }
}
