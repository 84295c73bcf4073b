//! Conversion of synthesized audio to the playback format
//!
//! Playback always gets mono, 22.05 kHz, 16-bit PCM WAV. `ffmpeg` does the
//! work when it is installed; otherwise MP3/WAV input is decoded, downmixed
//! and resampled in-process.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;

use crate::{Error, Result};

/// Sample rate of every file handed to the player
pub const PLAYBACK_SAMPLE_RATE: u32 = 22_050;

/// Converts an audio file into playback format
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Read `input`, write mono 22.05 kHz s16le WAV to `output`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Media`] if the input cannot be converted
    async fn transcode(&self, input: &Path, output: &Path) -> Result<()>;
}

/// Pick `ffmpeg` when available, the built-in decoder otherwise
#[must_use]
pub fn default_transcoder() -> Box<dyn Transcoder> {
    FfmpegTranscoder::locate().map_or_else(
        || {
            tracing::info!("ffmpeg not found, using built-in transcoder");
            Box::new(NativeTranscoder) as Box<dyn Transcoder>
        },
        |ffmpeg| Box::new(ffmpeg) as Box<dyn Transcoder>,
    )
}

/// Runs the `ffmpeg` binary
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
}

impl FfmpegTranscoder {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Find `ffmpeg` on `PATH`
    #[must_use]
    pub fn locate() -> Option<Self> {
        let program = which::which("ffmpeg").ok()?;
        tracing::debug!(path = %program.display(), "found ffmpeg");
        Some(Self::new(program))
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    async fn transcode(&self, input: &Path, output: &Path) -> Result<()> {
        let result = tokio::process::Command::new(&self.program)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .args(["-ar", &PLAYBACK_SAMPLE_RATE.to_string(), "-ac", "1", "-acodec", "pcm_s16le"])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| Error::Media(format!("failed to run ffmpeg: {e}")))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let last_line = stderr.lines().last().unwrap_or_default();
            return Err(Error::Media(format!(
                "ffmpeg exited with {}: {last_line}",
                result.status
            )));
        }

        Ok(())
    }
}

/// In-process MP3/WAV decoder and resampler
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeTranscoder;

#[async_trait]
impl Transcoder for NativeTranscoder {
    fn name(&self) -> &'static str {
        "native"
    }

    async fn transcode(&self, input: &Path, output: &Path) -> Result<()> {
        let data = tokio::fs::read(input).await?;
        let wav = tokio::task::spawn_blocking(move || to_playback_wav(&data))
            .await
            .map_err(|e| Error::Media(format!("transcode task failed: {e}")))??;
        tokio::fs::write(output, wav).await?;
        Ok(())
    }
}

/// Convert MP3 or WAV bytes into mono 22.05 kHz s16le WAV bytes
///
/// # Errors
///
/// Returns error if the input cannot be decoded
pub fn to_playback_wav(data: &[u8]) -> Result<Vec<u8>> {
    let (samples, sample_rate) = if data.starts_with(b"RIFF") {
        decode_wav(data)?
    } else {
        decode_mp3(data)?
    };

    if samples.is_empty() {
        return Err(Error::Media("no audio decoded".to_string()));
    }

    let samples = if sample_rate == PLAYBACK_SAMPLE_RATE {
        samples
    } else {
        resample_audio(&samples, sample_rate, PLAYBACK_SAMPLE_RATE)?
    };

    samples_to_wav(&samples, PLAYBACK_SAMPLE_RATE)
}

/// Decode WAV to mono f32 samples and the sample rate
fn decode_wav(data: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::new(Cursor::new(data))
        .map_err(|e| Error::Media(format!("WAV decode error: {e}")))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Media(format!("WAV decode error: {e}")))?,
        hound::SampleFormat::Int => {
            #[allow(clippy::cast_precision_loss)]
            let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            #[allow(clippy::cast_precision_loss)]
            let samples = reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::Media(format!("WAV decode error: {e}")))?;
            samples
        }
    };

    Ok((downmix(&interleaved, usize::from(spec.channels)), spec.sample_rate))
}

/// Decode MP3 to mono f32 samples and the sample rate
#[allow(clippy::cast_sign_loss)]
fn decode_mp3(data: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(data));
    let mut samples = Vec::new();
    let mut sample_rate = PLAYBACK_SAMPLE_RATE;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                sample_rate = frame.sample_rate as u32;
                let pcm: Vec<f32> = frame.data.iter().map(|&s| f32::from(s) / 32768.0).collect();
                samples.extend(downmix(&pcm, frame.channels));
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Media(format!("MP3 decode error: {e}"))),
        }
    }

    Ok((samples, sample_rate))
}

/// Average interleaved channels into one
#[allow(clippy::cast_precision_loss)]
fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Resample mono audio using rubato
///
/// The final partial chunk is zero-padded and the output trimmed to the
/// expected length.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn resample_audio(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    use rubato::{FftFixedIn, Resampler};

    let chunk_size = 1024;
    let sub_chunks = 2;

    let mut resampler =
        FftFixedIn::<f64>::new(from_rate as usize, to_rate as usize, chunk_size, sub_chunks, 1)
            .map_err(|e| Error::Media(format!("resampler init failed: {e}")))?;

    let expected = (samples.len() as f64 * f64::from(to_rate) / f64::from(from_rate)).round() as usize;
    let mut output = Vec::with_capacity(expected + chunk_size);

    for chunk in samples.chunks(chunk_size) {
        let mut input: Vec<f64> = chunk.iter().map(|&s| f64::from(s)).collect();
        input.resize(chunk_size, 0.0);
        let result = resampler
            .process(&[input], None)
            .map_err(|e| Error::Media(format!("resample failed: {e}")))?;
        output.extend(result[0].iter().map(|&s| s as f32));
    }

    output.truncate(expected);
    Ok(output)
}

/// Encode mono f32 samples as 16-bit PCM WAV
///
/// # Errors
///
/// Returns error if encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Media(e.to_string()))?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Media(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Media(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}
