//! Audio playback to speakers

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleRate;

use crate::{Error, Result};

/// Plays a WAV file to completion
pub trait Player: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Play `wav`, returning once the clip has finished
    ///
    /// # Errors
    ///
    /// Returns [`Error::Media`] if the file cannot be read or played
    fn play(&self, wav: &Path) -> Result<()>;
}

/// Decoded clip ready for the output device
struct Clip {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Clip {
    /// Load a mono 16-bit WAV file
    fn load(path: &Path) -> Result<Self> {
        let mut reader = hound::WavReader::open(path)
            .map_err(|e| Error::Media(format!("{}: {e}", path.display())))?;
        let spec = reader.spec();
        let channels = usize::from(spec.channels.max(1));

        let raw: Vec<i16> = reader
            .samples::<i16>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Media(format!("{}: {e}", path.display())))?;

        // keep the first channel if the file was not downmixed
        let samples = raw
            .iter()
            .step_by(channels)
            .map(|&s| f32::from(s) / 32768.0)
            .collect();

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
        })
    }

    #[allow(clippy::cast_precision_loss)]
    fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }
}

/// Plays through the default output device
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalPlayer;

impl CpalPlayer {
    /// Check that an output device exists
    ///
    /// # Errors
    ///
    /// Returns error if no output device is available
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Media("no output device available".to_string()))?;

        tracing::debug!(
            device = %device.name().unwrap_or_default(),
            "audio playback initialized"
        );

        Ok(Self)
    }
}

impl Player for CpalPlayer {
    fn name(&self) -> &'static str {
        "cpal"
    }

    fn play(&self, wav: &Path) -> Result<()> {
        let clip = Clip::load(wav)?;
        if clip.samples.is_empty() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Media("no output device".to_string()))?;

        let rate = SampleRate(clip.sample_rate);
        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Media(e.to_string()))?
            .find(|c| c.channels() == 1 && c.min_sample_rate() <= rate && c.max_sample_rate() >= rate)
            .or_else(|| {
                // Fallback: try stereo
                device.supported_output_configs().ok()?.find(|c| {
                    c.channels() == 2 && c.min_sample_rate() <= rate && c.max_sample_rate() >= rate
                })
            })
            .ok_or_else(|| {
                Error::Media(format!("no output config for {} Hz", clip.sample_rate))
            })?;

        let config = supported_config.with_sample_rate(rate).config();
        let channels = usize::from(config.channels);
        let duration = clip.duration();

        let samples = Arc::new(clip.samples);
        let position = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicBool::new(false));

        let stream = {
            let samples = Arc::clone(&samples);
            let position = Arc::clone(&position);
            let finished = Arc::clone(&finished);
            device
                .build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        let mut pos = position.load(Ordering::Relaxed);
                        for frame in data.chunks_mut(channels) {
                            let sample = samples.get(pos).copied().unwrap_or_else(|| {
                                finished.store(true, Ordering::Release);
                                0.0
                            });
                            frame.fill(sample);
                            pos = (pos + 1).min(samples.len());
                        }
                        position.store(pos, Ordering::Relaxed);
                    },
                    |err| {
                        tracing::error!(error = %err, "audio playback error");
                    },
                    None,
                )
                .map_err(|e| Error::Media(e.to_string()))?
        };

        stream.play().map_err(|e| Error::Media(e.to_string()))?;

        // Poll for completion with timeout
        let start = Instant::now();
        let timeout = duration + Duration::from_millis(500);
        while !finished.load(Ordering::Acquire) {
            if start.elapsed() > timeout {
                tracing::warn!("playback did not report completion in time");
                break;
            }
            std::thread::sleep(Duration::from_millis(20));
        }

        // Small delay to ensure audio finishes
        std::thread::sleep(Duration::from_millis(100));

        drop(stream);
        tracing::debug!(samples = samples.len(), "playback complete");

        Ok(())
    }
}

/// Waits out the clip length without making sound (headless runs)
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPlayer;

impl Player for NullPlayer {
    fn name(&self) -> &'static str {
        "null"
    }

    fn play(&self, wav: &Path) -> Result<()> {
        let clip = Clip::load(wav)?;
        std::thread::sleep(clip.duration());
        Ok(())
    }
}
