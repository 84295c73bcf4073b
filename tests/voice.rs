//! Voice pipeline integration tests
//!
//! Runs the orchestrator against a mock synthesis server without audio
//! hardware

use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use teddy_companion::voice::{SynthesisClient, samples_to_wav, to_playback_wav};
use teddy_companion::{Error, Mood};

mod common;
use common::voice_rig;

fn fake_wav() -> Vec<u8> {
    samples_to_wav(&vec![0.1; 441], 22_050).unwrap()
}

#[tokio::test]
async fn test_speak_plays_synthesized_audio() {
    let server = MockServer::start_async().await;
    let audio = fake_wav();
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/synthesize")
                .json_body_partial(r#"{"text":"hello bear","speaker":"default","language":"en"}"#);
            then.status(200).header("content-type", "audio/wav").body(&audio);
        })
        .await;

    let client = SynthesisClient::new(&server.url("/synthesize"), Duration::from_secs(5)).unwrap();
    let rig = voice_rig(Arc::new(client));

    rig.voice
        .try_speak("hello bear", Some(Mood::Happy), false)
        .await
        .unwrap();

    mock.assert_async().await;
    let plays = rig.player.plays();
    assert_eq!(plays.len(), 1);
    assert!(plays[0].0);
    assert_eq!(plays[0].1, Mood::Happy);
    assert_eq!(plays[0].2, audio);
    assert!(!rig.face.is_speaking());
    assert!(rig.actuator.commands().is_empty());
}

#[tokio::test]
async fn test_synthesis_timeout_never_leaves_speaking_set() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/synthesize");
            then.status(200)
                .delay(Duration::from_secs(2))
                .body(fake_wav());
        })
        .await;

    let client =
        SynthesisClient::new(&server.url("/synthesize"), Duration::from_millis(200)).unwrap();
    let rig = voice_rig(Arc::new(client));

    let result = rig.voice.try_speak("hello", Some(Mood::Love), true).await;

    assert!(matches!(result, Err(Error::Transport(ref msg)) if msg.contains("timed out")));
    assert!(!rig.face.is_speaking());
    assert_eq!(rig.face.mood(), Mood::Neutral);
    assert!(rig.player.plays().is_empty());
    assert!(rig.actuator.commands().is_empty());
}

#[tokio::test]
async fn test_server_error_aborts_speech() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/synthesize");
            then.status(500).body("model not loaded");
        })
        .await;

    let client = SynthesisClient::new(&server.url("/synthesize"), Duration::from_secs(5)).unwrap();
    let rig = voice_rig(Arc::new(client));

    let result = rig.voice.try_speak("hello", None, false).await;

    assert!(matches!(result, Err(Error::Transport(ref msg)) if msg.contains("500")));
    assert!(rig.player.plays().is_empty());

    // speak swallows the same failure
    rig.voice.speak("hello", None, false).await;
    assert!(!rig.face.is_speaking());
}

#[tokio::test]
async fn test_head_shake_runs_alongside_playback() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/synthesize");
            then.status(200).body(fake_wav());
        })
        .await;

    let client = SynthesisClient::new(&server.url("/synthesize"), Duration::from_secs(5)).unwrap();
    let rig = voice_rig(Arc::new(client));

    rig.voice.try_speak("no way", None, true).await.unwrap();

    // Gesture thread starts before playback; it has at least centered the head
    let actuator = rig.actuator.clone();
    assert!(common::wait_for(Duration::from_secs(1), || !actuator.commands().is_empty()).await);
    assert_eq!(rig.player.plays()[0].1, Mood::Neutral);
}

#[tokio::test]
async fn test_health_probe() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/health");
            then.status(200).json_body(serde_json::json!({
                "status": "ok",
                "voice_cloning": false,
                "english_voice": true,
                "japanese_voice": true
            }));
        })
        .await;

    let client = SynthesisClient::new(&server.url("/synthesize"), Duration::from_secs(5)).unwrap();
    let health = client.health().await.unwrap();

    assert_eq!(health.status, "ok");
    assert!(!health.voice_cloning);
    assert!(health.japanese_voice);
}

#[test]
fn test_native_conversion_output_format() {
    let stereo = {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 24_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..2_400_i16 {
            writer.write_sample(i).unwrap();
            writer.write_sample(-i).unwrap();
        }
        writer.finalize().unwrap();
        cursor.into_inner()
    };

    let wav = to_playback_wav(&stereo).unwrap();
    let reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
    let spec = reader.spec();

    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 22_050);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(reader.duration(), 2_205);
}
