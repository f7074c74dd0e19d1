use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::Context;
use overlaycore::{
    DetectionBox, DetectionFeed, FilterMode, FrameCallback, FrameId, Player, PlayerEvent,
    SessionHandle, SessionInput, SubscriptionToken, SyncConfig, SyncSession,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// A recorded viewing session.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    pub camera_id: String,
    /// Native video size, `None` until the player has metadata
    #[serde(default)]
    pub native: Option<(f64, f64)>,
    #[serde(default = "default_container")]
    pub container: (f64, f64),
    /// Answer given to every track prompt
    #[serde(default = "default_confirm")]
    pub confirm: bool,
    /// Keeps the session alive after the last step
    #[serde(default)]
    pub duration_ms: u64,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Segment { id: String },
    Elapsed { seconds: f64 },
    Player { event: PlayerEvent },
    Resize { width: f64, height: f64 },
    #[serde(rename_all = "camelCase")]
    Detection {
        frame_id: FrameId,
        boxes: Vec<DetectionBox>,
    },
    Click { x: f64, y: f64 },
    Acknowledge,
    Filter { mode: FilterMode },
    Press { label: String },
}

fn default_container() -> (f64, f64) {
    (1280.0, 720.0)
}

fn default_confirm() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub events: usize,
    pub lagged: u64,
    pub frames_dropped: u64,
    pub frames_stale: u64,
    pub stall_trips: u64,
    pub reloads: usize,
}

impl Script {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read script {}", path.display()))?;
        let mut script: Script = serde_json::from_str(&text)
            .with_context(|| format!("parse script {}", path.display()))?;
        script.steps.sort_by_key(|s| s.at_ms);
        Ok(script)
    }
}

struct PlayerState {
    segment: Option<String>,
    native: Option<(f64, f64)>,
    container: (f64, f64),
    base: f64,
    since: Instant,
    playing: bool,
    reloads: usize,
}

impl PlayerState {
    fn elapsed(&self) -> f64 {
        if self.playing {
            self.base + self.since.elapsed().as_secs_f64()
        } else {
            self.base
        }
    }
}

/// Player driven by the script. Media time advances with the tokio clock
/// while playing.
#[derive(Clone)]
pub struct ScriptedPlayer(Arc<Mutex<PlayerState>>);

impl ScriptedPlayer {
    pub fn new(native: Option<(f64, f64)>, container: (f64, f64)) -> Self {
        Self(Arc::new(Mutex::new(PlayerState {
            segment: None,
            native,
            container,
            base: 0.0,
            since: Instant::now(),
            playing: false,
            reloads: 0,
        })))
    }

    fn state(&self) -> MutexGuard<'_, PlayerState> {
        // a poisoned lock only means a panicking test thread
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_segment(&self, id: &str) {
        self.state().segment = Some(id.to_string());
    }

    pub fn set_elapsed(&self, seconds: f64) {
        let mut state = self.state();
        state.base = seconds;
        state.since = Instant::now();
    }

    pub fn resize(&self, width: f64, height: f64) {
        self.state().container = (width, height);
    }

    pub fn reloads(&self) -> usize {
        self.state().reloads
    }
}

impl Player for ScriptedPlayer {
    fn current_elapsed(&self) -> f64 {
        self.state().elapsed()
    }

    fn current_segment_id(&self) -> Option<String> {
        self.state().segment.clone()
    }

    fn native_dimensions(&self) -> Option<(f64, f64)> {
        self.state().native
    }

    fn displayed_dimensions(&self) -> (f64, f64) {
        self.state().container
    }

    fn play(&mut self) {
        let mut state = self.state();
        if !state.playing {
            state.since = Instant::now();
            state.playing = true;
        }
    }

    fn pause(&mut self) {
        let mut state = self.state();
        state.base = state.elapsed();
        state.playing = false;
    }

    fn reload_source(&mut self) {
        let mut state = self.state();
        state.reloads += 1;
        state.segment = None;
        state.base = 0.0;
        state.since = Instant::now();
        info!(reloads = state.reloads, "player source reloaded");
    }

    fn show_notice(&mut self, message: &str) {
        warn!("notice: {}", message);
    }
}

#[derive(Default)]
struct FeedState {
    next_token: SubscriptionToken,
    subscribers: HashMap<SubscriptionToken, (String, FrameCallback)>,
}

/// Detection feed fed from the script's detection steps.
#[derive(Clone, Default)]
pub struct ScriptedFeed(Arc<Mutex<FeedState>>);

impl ScriptedFeed {
    fn state(&self) -> MutexGuard<'_, FeedState> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns how many subscribers got the frame.
    pub fn deliver(&self, camera_id: &str, frame_id: FrameId, boxes: &[DetectionBox]) -> usize {
        let mut state = self.state();
        let mut delivered = 0;
        for (camera, on_frame) in state.subscribers.values_mut() {
            if camera == camera_id {
                on_frame(boxes.to_vec(), frame_id);
                delivered += 1;
            }
        }
        delivered
    }

    pub fn subscribers(&self) -> usize {
        self.state().subscribers.len()
    }
}

impl DetectionFeed for ScriptedFeed {
    fn subscribe(&mut self, camera_id: &str, on_frame: FrameCallback) -> SubscriptionToken {
        let mut state = self.state();
        state.next_token += 1;
        let token = state.next_token;
        state
            .subscribers
            .insert(token, (camera_id.to_string(), on_frame));
        debug!(camera = camera_id, token, "feed subscribed");
        token
    }

    fn unsubscribe(&mut self, token: SubscriptionToken) {
        if self.state().subscribers.remove(&token).is_none() {
            warn!(token, "unsubscribe of unknown token");
        }
    }
}

/// Plays the script against a fresh session and writes every outward event
/// to `out` as one JSON line.
pub async fn run<W: Write>(
    script: &Script,
    config: SyncConfig,
    out: &mut W,
) -> anyhow::Result<Summary> {
    let player = ScriptedPlayer::new(script.native, script.container);
    let feed = ScriptedFeed::default();
    let answer = script.confirm;
    let (session, handle) = SyncSession::attach(
        script.camera_id.as_str(),
        config,
        player.clone(),
        feed.clone(),
        move |prompt: &str| {
            debug!(prompt, answer, "track prompt");
            answer
        },
        Instant::now(),
    )
    .context("attach overlay session")?;
    let mut rx = session.subscribe();

    let driven = async {
        let session = session.run().await;
        let summary = Summary {
            frames_dropped: session.queue().dropped(),
            frames_stale: session.queue().stale(),
            stall_trips: session.watchdog().trips(),
            ..Default::default()
        };
        // drops the last event sender, which ends the printer
        drop(session);
        summary
    };

    let driver = drive(script, &player, &feed, &handle);

    let printer = async {
        let mut printed = 0;
        let mut lagged = 0;
        loop {
            match rx.recv().await {
                Ok(event) => {
                    serde_json::to_writer(&mut *out, &event)?;
                    writeln!(out)?;
                    printed += 1;
                }
                Err(RecvError::Lagged(n)) => {
                    warn!("output fell behind, {} events lost", n);
                    lagged += n;
                }
                Err(RecvError::Closed) => break,
            }
        }
        Ok::<_, anyhow::Error>((printed, lagged))
    };

    let (mut summary, (), printed) = tokio::join!(driven, driver, printer);
    let (events, lagged) = printed?;
    summary.events = events;
    summary.lagged = lagged;
    summary.reloads = player.reloads();
    if feed.subscribers() != 0 {
        warn!("feed subscription left behind after teardown");
    }
    info!(?summary, "replay finished");
    Ok(summary)
}

async fn drive(
    script: &Script,
    player: &ScriptedPlayer,
    feed: &ScriptedFeed,
    handle: &SessionHandle,
) {
    let start = Instant::now();
    for step in &script.steps {
        sleep_until(start + Duration::from_millis(step.at_ms)).await;
        debug!(at_ms = step.at_ms, action = ?step.action, "replay step");
        match &step.action {
            Action::Segment { id } => player.set_segment(id),
            Action::Elapsed { seconds } => player.set_elapsed(*seconds),
            Action::Player { event } => {
                let mut player = player.clone();
                match event {
                    PlayerEvent::Play => player.play(),
                    PlayerEvent::Pause => player.pause(),
                    _ => {}
                }
                handle.player_event(*event);
            }
            Action::Resize { width, height } => {
                player.resize(*width, *height);
                handle.player_event(PlayerEvent::Resize);
            }
            Action::Detection { frame_id, boxes } => {
                if feed.deliver(&script.camera_id, *frame_id, boxes) == 0 {
                    debug!(frame_id, "no subscriber for detection");
                }
            }
            Action::Click { x, y } => {
                handle.click(*x, *y);
            }
            Action::Acknowledge => {
                handle.acknowledge();
            }
            Action::Filter { mode } => {
                handle.send(SessionInput::Filter(*mode));
            }
            Action::Press { label } => {
                handle.send(SessionInput::Press(label.clone()));
            }
        }
    }
    sleep_until(start + Duration::from_millis(script.duration_ms)).await;
    handle.teardown();
}
