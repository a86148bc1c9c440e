//! Voice lifecycle notifications
//!
//! The registry reports voices starting and stopping so the host can decide
//! when its output device needs to run.

use crate::synth::VoiceId;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Listener for voice lifecycle events.
///
/// Called from the control side of the registry, never from the audio callback.
pub trait VoiceEvents: Send + Sync {
    /// A voice was started
    fn voice_started(&self, id: VoiceId);

    /// A sounding voice restarted from the top of its waveform
    fn voice_retriggered(&self, _id: VoiceId) {}

    /// A voice was stopped and removed
    fn voice_stopped(&self, id: VoiceId);

    /// Every voice was dropped at once
    fn voices_cleared(&self) {}
}

/// Listener that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEvents;

impl VoiceEvents for NoEvents {
    fn voice_started(&self, _id: VoiceId) {}
    fn voice_stopped(&self, _id: VoiceId) {}
}

/// Counts voices that are currently sounding
#[derive(Debug, Default)]
pub struct PlayCounter {
    playing: AtomicUsize,
}

impl PlayCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of voices started and not yet stopped
    pub fn playing(&self) -> usize {
        self.playing.load(Ordering::Acquire)
    }

    /// True when nothing is sounding and the output can be paused
    pub fn is_idle(&self) -> bool {
        self.playing() == 0
    }
}

impl VoiceEvents for PlayCounter {
    fn voice_started(&self, _id: VoiceId) {
        self.playing.fetch_add(1, Ordering::AcqRel);
    }

    fn voice_stopped(&self, _id: VoiceId) {
        // Never goes below zero, even for unbalanced stops
        let _ = self
            .playing
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| Some(n.saturating_sub(1)));
    }

    fn voices_cleared(&self) {
        self.playing.store(0, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_tracks_starts_and_stops() {
        let counter = PlayCounter::new();
        assert!(counter.is_idle());

        counter.voice_started(1);
        counter.voice_started(2);
        assert_eq!(counter.playing(), 2);

        counter.voice_stopped(1);
        assert_eq!(counter.playing(), 1);
        assert!(!counter.is_idle());
    }

    #[test]
    fn test_counter_saturates_at_zero() {
        let counter = PlayCounter::new();
        counter.voice_stopped(1);
        counter.voice_stopped(1);
        assert_eq!(counter.playing(), 0);

        counter.voice_started(3);
        assert_eq!(counter.playing(), 1);
    }

    #[test]
    fn test_counter_cleared() {
        let counter = PlayCounter::new();
        counter.voice_started(1);
        counter.voice_started(2);
        counter.voices_cleared();
        assert!(counter.is_idle());
    }
}
