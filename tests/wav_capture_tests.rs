// Integration tests for the WAV capture device
//
// These tests record real frames from the synthetic backends to disk and
// read the finished takes back.

mod common;

use anyhow::Result;
use common::write_wav;
use karaoke_session::audio::{
    AudioFile, AudioSource, CaptureConfig, CaptureDevice, WavCaptureDevice,
};
use std::time::Duration;
use tempfile::TempDir;

fn tone_device() -> WavCaptureDevice {
    WavCaptureDevice::new(AudioSource::Tone { frequency_hz: 440.0 }).with_buffer_duration_ms(10)
}

#[tokio::test]
async fn test_capture_writes_playable_take() -> Result<()> {
    let temp_dir = TempDir::new()?;
    // Nested directory is created on demand
    let destination = temp_dir.path().join("takes").join("recording-1.wav");
    let device = tone_device();

    let handle = device.open_capture(&CaptureConfig::default(), &destination).await?;
    assert_eq!(handle.destination(), destination.as_path());

    tokio::time::sleep(Duration::from_millis(200)).await;
    let path = device.close_capture(handle).await?;

    assert_eq!(path, destination);
    assert!(path.exists(), "Take file should exist");

    let take = AudioFile::open(&path)?;
    assert_eq!(take.sample_rate, 44100);
    assert_eq!(take.channels, 2);
    assert!(!take.samples.is_empty(), "Take should contain audio");
    assert!(take.duration_seconds > 0.0 && take.duration_seconds < 1.0);

    Ok(())
}

#[tokio::test]
async fn test_capture_follows_requested_format() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let destination = temp_dir.path().join("mono.wav");
    let device = tone_device();
    let config = CaptureConfig {
        sample_rate: 22050,
        channels: 1,
        bits_per_sample: 16,
    };

    let handle = device.open_capture(&config, &destination).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let path = device.close_capture(handle).await?;

    let take = AudioFile::open(&path)?;
    assert_eq!(take.sample_rate, 22050);
    assert_eq!(take.channels, 1);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_captures_are_independent() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let device = tone_device();
    let config = CaptureConfig::default();

    let first = device.open_capture(&config, &temp_dir.path().join("a.wav")).await?;
    let second = device.open_capture(&config, &temp_dir.path().join("b.wav")).await?;
    assert_ne!(first.id(), second.id());

    tokio::time::sleep(Duration::from_millis(50)).await;
    let a = device.close_capture(first).await?;
    let b = device.close_capture(second).await?;

    assert!(a.exists());
    assert!(b.exists());

    Ok(())
}

#[tokio::test]
async fn test_capture_from_file_input() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("singer.wav");
    write_wav(&input, 44100, 2, 60)?;

    let device = WavCaptureDevice::new(AudioSource::File {
        path: input,
        looped: false,
    })
    .with_buffer_duration_ms(10);

    let handle = device
        .open_capture(&CaptureConfig::default(), &temp_dir.path().join("take.wav"))
        .await?;
    // Long enough for the whole input to be replayed
    tokio::time::sleep(Duration::from_millis(300)).await;
    let path = device.close_capture(handle).await?;

    let take = AudioFile::open(&path)?;
    assert_eq!(take.samples.len(), 2646 * 2, "Every input sample should land in the take");

    Ok(())
}

#[tokio::test]
async fn test_unsupported_bit_depth_is_rejected() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let destination = temp_dir.path().join("hifi.wav");
    let device = tone_device();
    let config = CaptureConfig {
        bits_per_sample: 24,
        ..CaptureConfig::default()
    };

    assert!(device.open_capture(&config, &destination).await.is_err());
    assert!(!destination.exists(), "No file should be created for a refused capture");

    Ok(())
}

#[tokio::test]
async fn test_close_unknown_capture_fails() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let device = tone_device();
    let handle = device
        .open_capture(&CaptureConfig::default(), &temp_dir.path().join("once.wav"))
        .await?;
    let id = handle.id();
    device.close_capture(handle).await?;

    let stale = karaoke_session::audio::CaptureHandle::new(id, temp_dir.path().join("once.wav"));
    assert!(device.close_capture(stale).await.is_err());

    Ok(())
}
