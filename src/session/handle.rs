use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::info;

use super::events::SessionEvent;
use super::session::SessionController;
use super::snapshot::SessionSnapshot;
use super::take::TakeId;
use crate::error::{SessionError, SessionResult};

const COMMAND_CHANNEL_CAPACITY: usize = 32;

type Reply<T> = oneshot::Sender<SessionResult<T>>;

enum Command {
    BeginSession(Reply<()>),
    StartRecording(Reply<()>),
    StopRecording(Reply<Option<TakeId>>),
    PlayTake {
        take_id: TakeId,
        looping: Option<bool>,
        reply: Reply<()>,
    },
    TogglePlayback {
        take_id: TakeId,
        reply: Reply<()>,
    },
    PausePlayback(Reply<()>),
    ResumePlayback(Reply<()>),
    StopPlayback(Reply<()>),
    AdjustPitch {
        take_id: TakeId,
        semitones: f32,
        reply: Reply<f32>,
    },
    SetMasterVolume {
        volume: f32,
        reply: Reply<f32>,
    },
    DeleteTake {
        take_id: TakeId,
        reply: Reply<()>,
    },
    Snapshot(Reply<SessionSnapshot>),
    Shutdown(Reply<()>),
}

enum Inbound {
    Command(Command),
    Completion(super::session::CompletionNotice),
}

/// Cloneable handle to a controller running on its own task
///
/// Commands and engine completions are applied one at a time, in arrival
/// order, so callers on any task can share one session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<SessionEvent>,
}

/// Move the controller onto a tokio task and return a handle to it
pub fn spawn_session(controller: SessionController) -> SessionHandle {
    let (commands, inbox) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let events = controller.event_sender();

    tokio::spawn(run(controller, inbox));

    SessionHandle { commands, events }
}

async fn run(mut controller: SessionController, mut inbox: mpsc::Receiver<Command>) {
    info!("Session task started");

    loop {
        let inbound = tokio::select! {
            command = inbox.recv() => match command {
                Some(command) => Inbound::Command(command),
                None => break,
            },
            Some(notice) = controller.next_completion() => Inbound::Completion(notice),
        };

        match inbound {
            Inbound::Completion(notice) => controller.handle_completion(notice).await,
            Inbound::Command(Command::Shutdown(reply)) => {
                controller.end_session().await;
                reply.send(Ok(())).ok();
                info!("Session task stopped");
                return;
            }
            Inbound::Command(command) => dispatch(&mut controller, command).await,
        }
    }

    // Every handle is gone
    controller.end_session().await;
    info!("Session task stopped");
}

async fn dispatch(controller: &mut SessionController, command: Command) {
    match command {
        Command::BeginSession(reply) => {
            reply.send(controller.begin_session().await).ok();
        }
        Command::StartRecording(reply) => {
            reply.send(controller.start_recording().await).ok();
        }
        Command::StopRecording(reply) => {
            reply.send(controller.stop_recording().await).ok();
        }
        Command::PlayTake {
            take_id,
            looping,
            reply,
        } => {
            let result = match looping {
                Some(looping) => controller.play_take_with(take_id, looping).await,
                None => controller.play_take(take_id).await,
            };
            reply.send(result).ok();
        }
        Command::TogglePlayback { take_id, reply } => {
            reply.send(controller.toggle_playback(take_id).await).ok();
        }
        Command::PausePlayback(reply) => {
            reply.send(controller.pause_playback().await).ok();
        }
        Command::ResumePlayback(reply) => {
            reply.send(controller.resume_playback().await).ok();
        }
        Command::StopPlayback(reply) => {
            reply.send(controller.stop_playback().await).ok();
        }
        Command::AdjustPitch {
            take_id,
            semitones,
            reply,
        } => {
            reply.send(controller.adjust_pitch(take_id, semitones).await).ok();
        }
        Command::SetMasterVolume { volume, reply } => {
            reply.send(controller.set_master_volume(volume).await).ok();
        }
        Command::DeleteTake { take_id, reply } => {
            reply.send(controller.delete_take(take_id).await).ok();
        }
        Command::Snapshot(reply) => {
            reply.send(Ok(controller.snapshot())).ok();
        }
        Command::Shutdown(reply) => {
            // Handled by the run loop
            reply.send(Ok(())).ok();
        }
    }
}

impl SessionHandle {
    async fn request<T>(
        &self,
        operation: &'static str,
        command: impl FnOnce(Reply<T>) -> Command,
    ) -> SessionResult<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| SessionError::invalid_state(operation, "session has shut down"))?;
        response
            .await
            .map_err(|_| SessionError::invalid_state(operation, "session has shut down"))?
    }

    pub async fn begin_session(&self) -> SessionResult<()> {
        self.request("begin_session", Command::BeginSession).await
    }

    pub async fn start_recording(&self) -> SessionResult<()> {
        self.request("start_recording", Command::StartRecording).await
    }

    pub async fn stop_recording(&self) -> SessionResult<Option<TakeId>> {
        self.request("stop_recording", Command::StopRecording).await
    }

    /// Play with the configured loop policy, or override it with `looping`
    pub async fn play_take(&self, take_id: TakeId, looping: Option<bool>) -> SessionResult<()> {
        self.request("play_take", |reply| Command::PlayTake {
            take_id,
            looping,
            reply,
        })
        .await
    }

    pub async fn toggle_playback(&self, take_id: TakeId) -> SessionResult<()> {
        self.request("toggle_playback", |reply| Command::TogglePlayback { take_id, reply })
            .await
    }

    pub async fn pause_playback(&self) -> SessionResult<()> {
        self.request("pause_playback", Command::PausePlayback).await
    }

    pub async fn resume_playback(&self) -> SessionResult<()> {
        self.request("resume_playback", Command::ResumePlayback).await
    }

    pub async fn stop_playback(&self) -> SessionResult<()> {
        self.request("stop_playback", Command::StopPlayback).await
    }

    pub async fn adjust_pitch(&self, take_id: TakeId, semitones: f32) -> SessionResult<f32> {
        self.request("adjust_pitch", |reply| Command::AdjustPitch {
            take_id,
            semitones,
            reply,
        })
        .await
    }

    pub async fn set_master_volume(&self, volume: f32) -> SessionResult<f32> {
        self.request("set_master_volume", |reply| Command::SetMasterVolume { volume, reply })
            .await
    }

    pub async fn delete_take(&self, take_id: TakeId) -> SessionResult<()> {
        self.request("delete_take", |reply| Command::DeleteTake { take_id, reply })
            .await
    }

    pub async fn snapshot(&self) -> SessionResult<SessionSnapshot> {
        self.request("snapshot", Command::Snapshot).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// End the session and stop its task
    pub async fn shutdown(&self) -> SessionResult<()> {
        self.request("shutdown", Command::Shutdown).await
    }
}
