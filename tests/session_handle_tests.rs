// Tests for the serialized session task

mod common;

use anyhow::Result;
use common::{harness, Harness};
use karaoke_session::{
    spawn_session, ErrorKind, Mode, PlayButton, PlaybackState, SessionEvent,
};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::timeout;

/// Wait for the first event matching `predicate`
async fn wait_for(
    events: &mut broadcast::Receiver<SessionEvent>,
    predicate: impl Fn(&SessionEvent) -> bool,
) -> Result<SessionEvent> {
    let event = timeout(Duration::from_secs(2), async {
        loop {
            let event = events.recv().await?;
            if predicate(&event) {
                return Ok::<_, broadcast::error::RecvError>(event);
            }
        }
    })
    .await??;
    Ok(event)
}

#[tokio::test]
async fn test_handle_runs_a_recording_round() -> Result<()> {
    let Harness {
        controller,
        engine,
        capture,
        temp_dir: _temp_dir,
        ..
    } = harness();
    let session = spawn_session(controller);

    session.begin_session().await?;
    session.start_recording().await?;
    assert_eq!(session.snapshot().await?.mode, Mode::Capturing);

    let take_id = session.stop_recording().await?.expect("take saved");
    assert_eq!(capture.closed(), 1);

    session.play_take(take_id, None).await?;
    let snapshot = session.snapshot().await?;
    assert_eq!(snapshot.active_take_id, Some(take_id));
    assert_eq!(snapshot.playback_state, PlaybackState::Playing);
    assert_eq!(engine.live_take_handles(), 1);

    assert_eq!(session.adjust_pitch(take_id, 30.0).await?, 12.0);
    assert_eq!(session.set_master_volume(0.25).await?, 0.25);

    session.shutdown().await?;
    assert_eq!(engine.live_handles(), 0);

    Ok(())
}

#[tokio::test]
async fn test_handle_applies_engine_completions() -> Result<()> {
    let Harness {
        controller,
        engine,
        temp_dir: _temp_dir,
        ..
    } = harness();
    let session = spawn_session(controller);
    let mut events = session.subscribe();

    session.begin_session().await?;
    session.start_recording().await?;
    let take_id = session.stop_recording().await?.expect("take saved");
    session.play_take(take_id, Some(false)).await?;

    let handle = engine.last_loaded_id().expect("take loaded");
    assert!(engine.finish(handle));

    wait_for(&mut events, |event| {
        matches!(
            event,
            SessionEvent::PlaybackStateChanged { state: PlaybackState::Stopped, .. }
        )
    })
    .await?;

    let snapshot = session.snapshot().await?;
    assert_eq!(snapshot.active_take_id, None);
    assert_eq!(snapshot.takes[0].play_button, PlayButton::PlayAgain);
    assert_eq!(engine.release_count(handle), 1);

    session.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_handle_serializes_concurrent_callers() -> Result<()> {
    let Harness {
        controller,
        engine,
        temp_dir: _temp_dir,
        ..
    } = harness();
    let session = spawn_session(controller);

    session.begin_session().await?;
    let mut take_ids = Vec::new();
    for _ in 0..3 {
        session.start_recording().await?;
        take_ids.push(session.stop_recording().await?.expect("take saved"));
    }

    let mut tasks = Vec::new();
    for round in 0..12 {
        let session = session.clone();
        let take_id = take_ids[round % take_ids.len()];
        tasks.push(tokio::spawn(async move {
            let _ = session.toggle_playback(take_id).await;
        }));
    }
    for task in tasks {
        task.await?;
    }

    assert!(engine.live_take_handles() <= 1);
    assert_eq!(engine.peak_take_handles(), 1);

    session.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_handle_reports_errors() -> Result<()> {
    let Harness {
        controller,
        temp_dir: _temp_dir,
        ..
    } = harness();
    let session = spawn_session(controller);
    session.begin_session().await?;

    let err = session.pause_playback().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    session.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_calls_after_shutdown_fail() -> Result<()> {
    let Harness {
        controller,
        temp_dir: _temp_dir,
        ..
    } = harness();
    let session = spawn_session(controller);
    session.begin_session().await?;

    session.shutdown().await?;

    let err = session.snapshot().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(err.message(), "session has shut down");

    Ok(())
}
