//! chiptone - procedural waveform voices

use anyhow::{Context, Result};
use chiptone::config::{self, ChiptoneConfig, EXAMPLE_CONFIG};
use chiptone::engine::{
    default_device_name, list_output_devices, Cue, PlayCounter, Player, Recorder,
    RegistrySettings, Timeline, VoiceRegistry,
};
use chiptone::logging;
use chiptone::synth::WaveformShape;
use clap::Parser;
use log::{info, warn};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

mod cli;

use cli::{Cli, Commands};

/// Seconds of tail rendered after the last cue when no duration is given
const DEFAULT_TAIL_SECS: f64 = 1.0;

/// How often the live loop fires cues and syncs the device
const POLL_INTERVAL: Duration = Duration::from_millis(5);

fn main() -> Result<()> {
    logging::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            config: config_path,
            duration,
        } => {
            info!("Loading configuration from {:?}", config_path);
            let cfg = config::load_config(&config_path)?;
            let timeline = Timeline::from_voices(&cfg.voices);
            let duration = duration.unwrap_or_else(|| default_duration(&timeline));
            play_live(&cfg, timeline, duration)?;
        }

        Commands::Tone {
            shape,
            frequency,
            volume,
            duration,
            output,
        } => {
            let shape = WaveformShape::from_name(&shape).unwrap_or_else(|| {
                warn!("Unknown shape '{}', playing sine", shape);
                WaveformShape::Sine
            });
            let cfg = ChiptoneConfig::default();
            let timeline = Timeline::new(vec![
                Cue::play(0.0, shape, frequency, volume, 0),
                Cue::stop(duration, 0),
            ]);

            match output {
                Some(path) => record(&cfg, timeline, &path, duration)?,
                None => play_live(&cfg, timeline, duration)?,
            }
        }

        Commands::Record {
            config: config_path,
            output,
            duration,
        } => {
            info!("Loading configuration from {:?}", config_path);
            let cfg = config::load_config(&config_path)?;
            let timeline = Timeline::from_voices(&cfg.voices);
            let duration = duration.unwrap_or_else(|| default_duration(&timeline));
            record(&cfg, timeline, &output, duration)?;
        }

        Commands::Devices => {
            println!("Available output devices:\n");

            if let Some(name) = default_device_name() {
                println!("Default output: {}\n", name);
            }

            let devices = list_output_devices();
            if devices.is_empty() {
                println!("  (none found)");
            }
            for (name, config) in devices {
                println!(
                    "  - {} ({} Hz, {} ch)",
                    name, config.sample_rate.0, config.channels
                );
            }
        }

        Commands::Check {
            config: config_path,
        } => {
            println!("Checking configuration at {:?}...", config_path);

            match config::load_config(&config_path) {
                Ok(cfg) => {
                    println!("Configuration is valid!");
                    println!("  Sample rate: {} Hz", cfg.audio.sample_rate);
                    println!("  Channels: {}", cfg.audio.channels);
                    println!("  Buffer size: {}", cfg.audio.buffer_size);
                    println!("  Wave length: {} s", cfg.audio.wave_length_secs);
                    println!("  Voice gain: {}", cfg.mixer.voice_gain);
                    println!("  Clip: {:?}", cfg.mixer.clip);
                    println!("  Stereo: {:?}", cfg.mixer.stereo);
                    println!("  Max voices: {}", cfg.mixer.max_voices);
                    println!("  Voices: {}", cfg.voices.len());
                    for voice in &cfg.voices {
                        let stop = voice
                            .stop
                            .map(|s| format!("{:.2}s", s))
                            .unwrap_or_else(|| "end".to_string());
                        println!(
                            "    - #{} {} {} Hz x{} [{:.2}s -> {}]",
                            voice.id, voice.shape, voice.frequency, voice.volume, voice.start, stop
                        );
                    }
                }
                Err(e) => {
                    println!("Configuration is invalid: {:#}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Init => {
            let path = "chiptone.yaml";
            if Path::new(path).exists() {
                println!("chiptone.yaml already exists. Not overwriting.");
            } else {
                std::fs::write(path, EXAMPLE_CONFIG)?;
                println!("Created chiptone.yaml with example configuration.");
            }
        }
    }

    Ok(())
}

fn default_duration(timeline: &Timeline) -> f64 {
    timeline.end_secs().unwrap_or(0.0) + DEFAULT_TAIL_SECS
}

/// Drive the timeline against the wall clock on the output device
fn play_live(cfg: &ChiptoneConfig, mut timeline: Timeline, duration: f64) -> Result<()> {
    let mut player = Player::open(cfg.audio.device.as_deref())?;
    let settings =
        RegistrySettings::from_config(cfg).with_sample_rate(player.sample_rate() as f32);

    let counter = Arc::new(PlayCounter::new());
    let (mut registry, renderer) = VoiceRegistry::with_events(settings, counter.clone());
    player.start(renderer)?;
    player.sync_with(&counter)?;

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    ctrlc::set_handler(move || handler_flag.store(false, Ordering::SeqCst))
        .context("failed to install Ctrl-C handler")?;

    info!("Playing {} cues for {:.1}s (Ctrl-C to stop)", timeline.len(), duration);
    let start = Instant::now();

    while running.load(Ordering::SeqCst) {
        let now = start.elapsed().as_secs_f64();
        if now >= duration {
            break;
        }

        if let Err(e) = timeline.fire_due(&mut registry, now) {
            warn!("Cue refused: {}", e);
        }
        player.sync_with(&counter)?;

        std::thread::sleep(POLL_INTERVAL);
    }

    registry.reset()?;
    player.stop();
    info!("Stopped after {:.1}s", start.elapsed().as_secs_f64());

    Ok(())
}

/// Render the timeline offline into a WAV file
fn record(cfg: &ChiptoneConfig, mut timeline: Timeline, output: &Path, duration: f64) -> Result<()> {
    let sample_rate = cfg.audio.sample_rate;
    let channels = cfg.audio.channels;
    let total_frames = (duration.max(0.0) * sample_rate as f64).round() as usize;

    info!("Recording {:.1}s to {:?}", duration, output);

    let (mut registry, mut renderer) = VoiceRegistry::new(RegistrySettings::from_config(cfg));
    let mut recorder = Recorder::new(output, sample_rate, channels)?;

    timeline.render_offline(
        &mut registry,
        &mut renderer,
        channels as usize,
        total_frames,
        cfg.audio.buffer_size,
        |block| recorder.write_buffer(block),
    )?;

    let recorded = recorder.duration_secs();
    recorder.finalize()?;
    info!("Recorded {:.2}s to {:?}", recorded, output);

    Ok(())
}
