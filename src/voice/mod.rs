//! Voice output
//!
//! Synthesis over HTTP, conversion to the playback format, blocking
//! playback, and the orchestrator that ties them to the face and head.

mod orchestrator;
mod playback;
mod synthesis;
mod transcode;

pub use orchestrator::{MOOD_DURATION, VoiceOrchestrator, VoiceSettings};
pub use playback::{CpalPlayer, NullPlayer, Player};
pub use synthesis::{
    SYNTHESIS_TIMEOUT, SynthesisClient, SynthesisHealth, SynthesisRequest, Synthesizer,
};
pub use transcode::{
    FfmpegTranscoder, NativeTranscoder, PLAYBACK_SAMPLE_RATE, Transcoder, default_transcoder,
    samples_to_wav, to_playback_wav,
};
