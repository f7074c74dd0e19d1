use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::clock::{ClockPhase, StreamClock};
use crate::config::SyncConfig;
use crate::control::{ControlBar, ControlButton};
use crate::error::SyncError;
use crate::message::{DetectionBox, DetectionFrame, FrameId, OutwardEvent, OverlayFrame};
use crate::overlay::{self, Confirm, FilterMode, RenderedBox};
use crate::player::{DetectionFeed, Player, PlayerEvent, SubscriptionToken};
use crate::queue::FrameSyncQueue;
use crate::scheduler::{Scheduler, TimerKind};
use crate::viewport::{compute_transform, ViewportTransform};
use crate::watchdog::{BufferWatchdog, STALL_NOTICE};

pub const PRIMARY_LABEL: &str = "Set primary";
pub const PRIMARY_CONTROL: &str = "primary";

#[derive(Clone, Debug, PartialEq)]
pub enum SessionInput {
    Player(PlayerEvent),
    Detection(DetectionFrame),
    Click { x: f64, y: f64 },
    /// User closed the stall notice
    Acknowledge,
    Filter(FilterMode),
    Press(String),
    Teardown,
}

/// Sender side of a session's input loop.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionInput>,
}

impl SessionHandle {
    /// Returns `false` once the session is gone.
    pub fn send(&self, input: SessionInput) -> bool {
        self.tx.send(input).is_ok()
    }

    pub fn player_event(&self, event: PlayerEvent) -> bool {
        self.send(SessionInput::Player(event))
    }

    pub fn click(&self, x: f64, y: f64) -> bool {
        self.send(SessionInput::Click { x, y })
    }

    pub fn acknowledge(&self) -> bool {
        self.send(SessionInput::Acknowledge)
    }

    pub fn teardown(&self) -> bool {
        self.send(SessionInput::Teardown)
    }
}

/// Synchronization state for one camera view.
///
/// All handlers run on one loop, either called directly or through
/// [`SyncSession::run`], so nothing in here is shared or locked.
pub struct SyncSession<P, F>
where
    P: Player,
    F: DetectionFeed,
{
    camera_id: String,
    config: SyncConfig,
    player: P,
    feed: F,
    subscription: Option<SubscriptionToken>,
    inputs: Option<mpsc::UnboundedReceiver<SessionInput>>,

    clock: StreamClock,
    watchdog: BufferWatchdog,
    queue: FrameSyncQueue,
    scheduler: Scheduler,

    transform: ViewportTransform,
    filter: FilterMode,
    rendered: Vec<RenderedBox>,
    playing: bool,

    controls: ControlBar,
    confirm: Box<dyn Confirm + Send>,
    events: broadcast::Sender<OutwardEvent>,
    torn_down: bool,
}

impl<P, F> SyncSession<P, F>
where
    P: Player,
    F: DetectionFeed,
{
    /// Subscribes to the camera's detections and starts the release timer.
    /// Fails without subscribing when `config` does not validate.
    pub fn attach<C>(
        camera_id: impl Into<String>,
        config: SyncConfig,
        player: P,
        mut feed: F,
        confirm: C,
        now: Instant,
    ) -> Result<(Self, SessionHandle), SyncError>
    where
        C: Confirm + Send + 'static,
    {
        config.validate()?;
        let camera_id = camera_id.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(256);

        let feed_tx = tx.clone();
        let subscription = feed.subscribe(
            &camera_id,
            Box::new(move |boxes: Vec<DetectionBox>, frame_id: FrameId| {
                let _ = feed_tx.send(SessionInput::Detection(DetectionFrame::new(frame_id, boxes)));
            }),
        );

        let mut controls = ControlBar::default();
        let primary = events.clone();
        controls.add(ControlButton::new(PRIMARY_LABEL, "bi-zoom-in", move || {
            let _ = primary.send(OutwardEvent::Control(PRIMARY_CONTROL.to_string()));
        }));

        let mut scheduler = Scheduler::default();
        scheduler.schedule(TimerKind::FrameRelease, config.release_tick(), now);

        info!(camera = %camera_id, subscription, "overlay session attached");
        let session = Self {
            clock: StreamClock::new(&config),
            watchdog: BufferWatchdog::from_config(&config),
            queue: FrameSyncQueue::new(config.queue_capacity),
            filter: config.filter,
            camera_id,
            config,
            player,
            feed,
            subscription: Some(subscription),
            inputs: Some(rx),
            scheduler,
            transform: ViewportTransform::default(),
            rendered: Vec::new(),
            playing: false,
            controls,
            confirm: Box::new(confirm),
            events,
            torn_down: false,
        };
        Ok((session, SessionHandle { tx }))
    }

    /// Adds a button next to the default ones, pressed through
    /// [`SessionInput::Press`] with its label.
    pub fn with_control(mut self, button: ControlButton) -> Self {
        self.controls.add(button);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OutwardEvent> {
        self.events.subscribe()
    }

    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    pub fn clock(&self) -> &StreamClock {
        &self.clock
    }

    pub fn watchdog(&self) -> &BufferWatchdog {
        &self.watchdog
    }

    pub fn queue(&self) -> &FrameSyncQueue {
        &self.queue
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn transform(&self) -> ViewportTransform {
        self.transform
    }

    pub fn rendered(&self) -> &[RenderedBox] {
        &self.rendered
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Stream time right now, `None` until the clock has a baseline.
    pub fn timestamp(&self) -> Option<f64> {
        self.clock
            .compute_timestamp(self.player.current_elapsed())
    }

    /// Frame id the player has caught up to at `timestamp`.
    pub fn frame_id_at(&self, timestamp: f64) -> FrameId {
        (timestamp * self.config.frame_rate).floor().max(0.0) as FrameId
    }

    /// Drives the session until teardown. Inputs come from the
    /// [`SessionHandle`] returned by `attach` and from the detection feed.
    pub async fn run(mut self) -> Self {
        let Some(mut inputs) = self.inputs.take() else {
            warn!(camera = %self.camera_id, "session input loop already consumed");
            return self;
        };

        while !self.torn_down {
            let deadline = self.scheduler.next_deadline();
            let timer = sleep_until(deadline.unwrap_or_else(Instant::now));
            tokio::select! {
                input = inputs.recv() => match input {
                    Some(input) => self.handle_input(input, Instant::now()),
                    None => {
                        debug!(camera = %self.camera_id, "session inputs closed");
                        self.teardown();
                    }
                },
                _ = timer, if deadline.is_some() => {
                    self.fire_due(Instant::now());
                }
            }
        }
        self
    }

    /// Fires the timers already due at `now`, then handles `input`.
    pub fn handle_input(&mut self, input: SessionInput, now: Instant) {
        if self.torn_down {
            return;
        }
        self.fire_due(now);
        match input {
            SessionInput::Player(event) => self.on_player_event(event, now),
            SessionInput::Detection(frame) => self.on_detection(frame),
            SessionInput::Click { x, y } => self.on_click(x, y),
            SessionInput::Acknowledge => self.on_acknowledge(now),
            SessionInput::Filter(mode) => {
                self.filter = mode;
                self.render();
            }
            SessionInput::Press(label) => {
                if !self.controls.press(&label) {
                    warn!(camera = %self.camera_id, label = %label, "no such control");
                }
            }
            SessionInput::Teardown => {
                self.teardown();
            }
        }
    }

    /// Fires every timer due at `now`. Returns how many fired.
    pub fn fire_due(&mut self, now: Instant) -> usize {
        let mut fired = 0;
        while let Some(kind) = self.scheduler.pop_due(now) {
            fired += 1;
            match kind {
                TimerKind::SegmentPoll => self.poll_segment(now),
                TimerKind::FrameRelease => self.release_frames(),
                TimerKind::TimestampPublish => {
                    if let Some(ts) = self.timestamp() {
                        self.emit(OutwardEvent::Timestamp(ts));
                    }
                }
                TimerKind::WatchdogCountdown => self.countdown(),
            }
        }
        fired
    }

    /// Cancels every timer, unsubscribes from the feed and drops queued
    /// frames. Returns `false` if the session was already torn down.
    pub fn teardown(&mut self) -> bool {
        if self.torn_down {
            return false;
        }
        self.torn_down = true;
        let timers = self.scheduler.cancel_all();
        if let Some(token) = self.subscription.take() {
            self.feed.unsubscribe(token);
        }
        self.queue.flush();
        self.rendered.clear();
        info!(camera = %self.camera_id, timers, "overlay session torn down");
        true
    }

    fn on_player_event(&mut self, event: PlayerEvent, now: Instant) {
        debug!(camera = %self.camera_id, ?event, "player event");
        match event {
            PlayerEvent::Play => {
                if !self.playing {
                    self.playing = true;
                    self.scheduler.schedule(
                        TimerKind::TimestampPublish,
                        self.config.timestamp_tick(),
                        now,
                    );
                    self.emit(OutwardEvent::Playback(true));
                }
                if !self.scheduler.is_scheduled(TimerKind::SegmentPoll) {
                    self.scheduler
                        .schedule(TimerKind::SegmentPoll, self.config.search_poll(), now);
                }
                self.watchdog.arm(self.playing, self.clock.is_acquired());
                self.update_viewport();
            }
            PlayerEvent::Pause => self.on_paused(),
            PlayerEvent::Stall => {
                if self.watchdog.on_stall() {
                    self.scheduler.schedule(
                        TimerKind::WatchdogCountdown,
                        self.config.stall_tick_period(),
                        now,
                    );
                }
            }
            PlayerEvent::Resume => {
                if self.watchdog.on_resume() {
                    self.scheduler.cancel(TimerKind::WatchdogCountdown);
                }
            }
            PlayerEvent::Resize | PlayerEvent::FirstFrameLoaded => self.update_viewport(),
        }
    }

    fn on_paused(&mut self) {
        if self.watchdog.on_pause() {
            self.scheduler.cancel(TimerKind::WatchdogCountdown);
        }
        if self.playing {
            self.playing = false;
            self.scheduler.cancel(TimerKind::TimestampPublish);
            self.emit(OutwardEvent::Playback(false));
        }
    }

    fn on_detection(&mut self, frame: DetectionFrame) {
        if !self.watchdog.is_active() {
            debug!(
                camera = %self.camera_id,
                frame_id = frame.frame_id,
                state = ?self.watchdog.state(),
                "detection dropped, playback inactive"
            );
            return;
        }
        self.queue.enqueue(frame);
    }

    fn on_click(&mut self, x: f64, y: f64) {
        let Some(frame_id) = self.queue.current().map(|f| f.frame_id) else {
            return;
        };
        if let Some(request) = overlay::click(
            &self.camera_id,
            frame_id,
            &self.rendered,
            x,
            y,
            self.confirm.as_mut(),
        ) {
            self.emit(OutwardEvent::TrackRequest(request));
        }
    }

    fn on_acknowledge(&mut self, now: Instant) {
        if !self.watchdog.acknowledge() {
            return;
        }
        info!(camera = %self.camera_id, "reloading stream");
        self.player.reload_source();
        self.clock.reset();
        if self.config.flush_on_reload {
            self.queue.flush();
            self.render();
        }
        self.scheduler
            .schedule(TimerKind::SegmentPoll, self.config.search_poll(), now);
    }

    fn poll_segment(&mut self, now: Instant) {
        let Some(id) = self.player.current_segment_id() else {
            return;
        };
        let before = self.clock.phase();
        self.clock
            .observe_segment_id(&id, self.player.current_elapsed());

        if before != ClockPhase::Tracking && self.clock.phase() == ClockPhase::Tracking {
            self.scheduler
                .reschedule(TimerKind::SegmentPoll, self.config.track_poll(), now);
            self.watchdog.arm(self.playing, true);
        }
    }

    fn release_frames(&mut self) {
        let Some(ts) = self.timestamp() else {
            return;
        };
        if self.queue.tick(self.frame_id_at(ts)) {
            self.render();
        }
    }

    fn countdown(&mut self) {
        if !self.watchdog.tick() {
            return;
        }
        self.scheduler.cancel(TimerKind::WatchdogCountdown);
        warn!(camera = %self.camera_id, "stream stalled, pausing");
        self.player.pause();
        self.on_paused();
        self.player.show_notice(STALL_NOTICE);
        self.emit(OutwardEvent::Notice(STALL_NOTICE.to_string()));
    }

    fn update_viewport(&mut self) {
        let (width, height) = self.player.displayed_dimensions();
        let transform = compute_transform(width, height, self.player.native_dimensions());
        self.emit(OutwardEvent::Viewport(transform));
        if transform != self.transform {
            self.transform = transform;
            self.render();
        }
    }

    fn render(&mut self) {
        let frame_id = self.queue.current().map(|f| f.frame_id);
        self.rendered = match self.queue.current() {
            Some(frame) => overlay::render(&frame.boxes, self.filter, &self.transform),
            None => Vec::new(),
        };
        self.emit(OutwardEvent::Overlay(OverlayFrame {
            frame_id,
            boxes: self.rendered.clone(),
        }));
    }

    fn emit(&self, event: OutwardEvent) {
        // no receivers is fine
        let _ = self.events.send(event);
    }
}
