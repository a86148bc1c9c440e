//! Real-time audio playback using cpal
//!
//! The [`Renderer`] is moved into the output callback. Each callback zeroes a
//! scratch buffer, lets the renderer sum its voices into it and converts the
//! result to the device's sample format.

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use log::{error, info, warn};

use super::{PlayCounter, Renderer};

/// Frames mixed per pass inside the callback
const SCRATCH_FRAMES: usize = 1024;

/// Real-time audio player
pub struct Player {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    stream: Option<Stream>,
    paused: bool,
    can_pause: bool,
}

impl Player {
    /// Open an output device by name, or the default device
    pub fn open(device_name: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();
        let device = match device_name {
            Some(name) => host
                .output_devices()?
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| anyhow!("No output device named '{}'", name))?,
            None => host
                .default_output_device()
                .ok_or_else(|| anyhow!("No output device available"))?,
        };

        let supported = device
            .default_output_config()
            .context("failed to query output config")?;
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.into();

        info!(
            "Output device: {} ({} Hz, {} ch, {:?})",
            device.name().unwrap_or_else(|_| "unknown".to_string()),
            config.sample_rate.0,
            config.channels,
            sample_format
        );

        Ok(Self {
            device,
            config,
            sample_format,
            stream: None,
            paused: true,
            can_pause: true,
        })
    }

    /// Device sample rate; voices must be created at this rate
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// Start playing the renderer's voices
    pub fn start(&mut self, renderer: Renderer) -> Result<()> {
        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream::<f32>(renderer)?,
            SampleFormat::I16 => self.build_stream::<i16>(renderer)?,
            SampleFormat::U16 => self.build_stream::<u16>(renderer)?,
            SampleFormat::I32 => self.build_stream::<i32>(renderer)?,
            SampleFormat::F64 => self.build_stream::<f64>(renderer)?,
            other => return Err(anyhow!("Unsupported sample format '{}'", other)),
        };

        stream.play()?;
        self.stream = Some(stream);
        self.paused = false;
        info!("Audio stream started");

        Ok(())
    }

    /// Pause the device while nothing is sounding and resume it when something is.
    ///
    /// A device that refuses to pause keeps running; only a failed resume is an error.
    pub fn sync_with(&mut self, counter: &PlayCounter) -> Result<()> {
        let Some(stream) = &self.stream else {
            return Ok(());
        };
        sync_run_state(
            &mut self.paused,
            &mut self.can_pause,
            counter.is_idle(),
            || Ok(stream.pause()?),
            || Ok(stream.play()?),
        )
    }

    /// Pause the output stream
    pub fn pause(&mut self) -> Result<()> {
        if let Some(stream) = &self.stream {
            if !self.paused {
                stream.pause()?;
                self.paused = true;
                info!("Audio stream paused");
            }
        }
        Ok(())
    }

    /// Resume a paused output stream
    pub fn resume(&mut self) -> Result<()> {
        if let Some(stream) = &self.stream {
            if self.paused {
                stream.play()?;
                self.paused = false;
                info!("Audio stream resumed");
            }
        }
        Ok(())
    }

    /// Stop playback and drop the stream
    pub fn stop(&mut self) {
        self.stream = None;
        self.paused = true;
    }

    /// Check if currently playing
    pub fn is_playing(&self) -> bool {
        self.stream.is_some() && !self.paused
    }

    fn build_stream<T>(&self, mut renderer: Renderer) -> Result<Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let channels = self.config.channels as usize;
        let mut scratch = vec![0.0f32; SCRATCH_FRAMES * channels.max(1)];

        let stream = self.device.build_output_stream(
            &self.config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for out in data.chunks_mut(scratch.len()) {
                    let mix = &mut scratch[..out.len()];
                    mix.fill(0.0);
                    renderer.render(mix, channels);

                    for (sample, &value) in out.iter_mut().zip(mix.iter()) {
                        *sample = T::from_sample(value);
                    }
                }
            },
            |err| error!("Audio stream error: {}", err),
            None,
        )?;

        Ok(stream)
    }
}

/// Move a stream between running and paused to match `idle`
fn sync_run_state<P, R>(
    paused: &mut bool,
    can_pause: &mut bool,
    idle: bool,
    pause: P,
    resume: R,
) -> Result<()>
where
    P: FnOnce() -> Result<()>,
    R: FnOnce() -> Result<()>,
{
    if idle && !*paused && *can_pause {
        match pause() {
            Ok(()) => {
                *paused = true;
                info!("Audio stream paused");
            }
            Err(e) => {
                // Not retried; the stream just renders silence while idle
                *can_pause = false;
                warn!("Output device cannot pause, leaving it running: {:#}", e);
            }
        }
    } else if !idle && *paused {
        resume()?;
        *paused = false;
        info!("Audio stream resumed");
    }
    Ok(())
}

/// Get the default output device name
pub fn default_device_name() -> Option<String> {
    let host = cpal::default_host();
    host.default_output_device()
        .and_then(|d| d.name().ok())
}

/// List all available output devices
pub fn list_output_devices() -> Vec<(String, StreamConfig)> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    if let Ok(output_devices) = host.output_devices() {
        for device in output_devices {
            if let (Ok(name), Ok(config)) = (device.name(), device.default_output_config()) {
                devices.push((name, config.into()));
            }
        }
    }

    devices
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_idle_stream_is_paused() {
        let (mut paused, mut can_pause) = (false, true);
        sync_run_state(&mut paused, &mut can_pause, true, || Ok(()), || Ok(())).unwrap();
        assert!(paused);

        sync_run_state(&mut paused, &mut can_pause, false, || Ok(()), || Ok(())).unwrap();
        assert!(!paused);
    }

    #[test]
    fn test_pause_failure_keeps_stream_running() {
        let (mut paused, mut can_pause) = (false, true);
        let attempts = Cell::new(0);
        let refuse = || {
            attempts.set(attempts.get() + 1);
            Err(anyhow!("pause not supported"))
        };

        sync_run_state(&mut paused, &mut can_pause, true, refuse, || Ok(())).unwrap();
        assert!(!paused);
        assert!(!can_pause);

        // Later idle periods do not retry
        sync_run_state(&mut paused, &mut can_pause, true, refuse, || Ok(())).unwrap();
        assert_eq!(attempts.get(), 1);
        assert!(!paused);
    }

    #[test]
    fn test_resume_failure_is_reported() {
        let (mut paused, mut can_pause) = (true, true);
        let result = sync_run_state(
            &mut paused,
            &mut can_pause,
            false,
            || Ok(()),
            || Err(anyhow!("device lost")),
        );
        assert!(result.is_err());
        assert!(paused);
    }
}
