use std::time::Duration;
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::{debug, warn};

use crate::core::TokenSequence;
use crate::playback::commands::{PlaybackCommand, PlaybackEvent, SurfaceNotice, SurfaceRole};
use crate::playback::hub::SurfaceHub;
use crate::playback::{PlaybackState, PUNCTUATION_PAUSE_MS};

const COMMAND_QUEUE_DEPTH: usize = 64;

/// Handle for submitting commands to a running engine.
///
/// Cloneable; each surface gets one tagged with its role so the engine knows
/// who asked for a state change. Submission is non-blocking and carries no
/// return value.
#[derive(Clone)]
pub struct PlaybackHandle {
    tx: mpsc::Sender<PlaybackCommand>,
    role: SurfaceRole,
}

impl PlaybackHandle {
    /// A handle that tags its run-state commands with the given role
    pub fn for_role(&self, role: SurfaceRole) -> Self {
        Self {
            tx: self.tx.clone(),
            role,
        }
    }

    fn submit(&self, command: PlaybackCommand) {
        if self.tx.try_send(command).is_err() {
            warn!("playback engine unavailable, command dropped");
        }
    }

    pub fn load(&self, sequence: TokenSequence) {
        self.submit(PlaybackCommand::Load { sequence });
    }

    pub fn start(&self, sequence: TokenSequence, rate_ms: u64) {
        self.submit(PlaybackCommand::Start {
            sequence,
            rate_ms,
            origin: self.role,
        });
    }

    pub fn resume(&self) {
        self.submit(PlaybackCommand::Resume { origin: self.role });
    }

    pub fn stop(&self) {
        self.submit(PlaybackCommand::Stop { origin: self.role });
    }

    pub fn set_rate(&self, rate_ms: u64) {
        self.submit(PlaybackCommand::SetRate { rate_ms });
    }

    pub fn attach(
        &self,
        role: SurfaceRole,
        events: mpsc::UnboundedSender<PlaybackEvent>,
        notices: Option<mpsc::UnboundedSender<SurfaceNotice>>,
    ) {
        self.submit(PlaybackCommand::Attach {
            role,
            events,
            notices,
        });
    }

    pub fn detach(&self, role: SurfaceRole) {
        self.submit(PlaybackCommand::Detach { role });
    }
}

/// The single authoritative playback state machine.
///
/// Runs as one tokio task; every cursor/state mutation happens here. The only
/// suspension point is the delay before the next advance, held as an
/// `Option<Instant>`: any command clears or replaces the deadline and the
/// sleep future is rebuilt each loop turn, so a cancelled advance chain can
/// never fire a stale tick. At most one pending advance exists at any time.
pub struct PlaybackEngine {
    command_rx: mpsc::Receiver<PlaybackCommand>,
    hub: SurfaceHub,
    sequence: Option<TokenSequence>,
    rate: Duration,
    cursor: usize,
    state: PlaybackState,
    next_tick: Option<Instant>,
}

impl PlaybackEngine {
    pub fn new() -> (Self, PlaybackHandle) {
        let (tx, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let engine = Self {
            command_rx,
            hub: SurfaceHub::new(),
            sequence: None,
            rate: Duration::from_millis(200),
            cursor: 0,
            state: PlaybackState::Idle,
            next_tick: None,
        };
        (
            engine,
            PlaybackHandle {
                tx,
                role: SurfaceRole::Primary,
            },
        )
    }

    /// Drive the engine until every handle has been dropped.
    ///
    /// Commands win the race against an expiring advance timer, so a stop or
    /// restart issued while a delay is in flight always cancels it first.
    pub async fn run(mut self) {
        loop {
            let command = match self.next_tick {
                Some(deadline) => {
                    select! {
                        biased;
                        cmd = self.command_rx.recv() => match cmd {
                            Some(cmd) => Some(cmd),
                            None => break,
                        },
                        _ = time::sleep_until(deadline) => None,
                    }
                }
                None => match self.command_rx.recv().await {
                    Some(cmd) => Some(cmd),
                    None => break,
                },
            };

            match command {
                Some(command) => self.handle_command(command),
                None => self.tick(),
            }
        }
        debug!("playback engine shut down");
    }

    fn handle_command(&mut self, command: PlaybackCommand) {
        match command {
            PlaybackCommand::Load { sequence } => self.load(sequence),
            PlaybackCommand::Start {
                sequence,
                rate_ms,
                origin,
            } => self.start(sequence, rate_ms, origin),
            PlaybackCommand::Resume { origin } => self.resume(origin),
            PlaybackCommand::Stop { origin } => self.stop(origin),
            PlaybackCommand::SetRate { rate_ms } => self.set_rate(rate_ms),
            PlaybackCommand::Attach {
                role,
                events,
                notices,
            } => self.hub.attach(role, events, notices),
            PlaybackCommand::Detach { role } => self.hub.detach(role),
        }
    }

    /// Replace the held sequence. The cursor survives only when the incoming
    /// sequence is the one (by id) the engine already holds.
    fn load(&mut self, sequence: TokenSequence) {
        if self.sequence.as_ref().map(TokenSequence::id) != Some(sequence.id()) {
            self.cursor = 0;
        }
        self.sequence = Some(sequence);
    }

    fn start(&mut self, sequence: TokenSequence, rate_ms: u64, origin: SurfaceRole) {
        if rate_ms == 0 {
            warn!(rate_ms, "rejecting start with non-positive rate");
            return;
        }
        self.next_tick = None;
        self.load(sequence);
        self.rate = Duration::from_millis(rate_ms);
        self.begin(origin);
    }

    fn resume(&mut self, origin: SurfaceRole) {
        if self.sequence.is_none() {
            return;
        }
        self.next_tick = None;
        self.begin(origin);
    }

    /// Enter Running over the held sequence; the first advance fires
    /// immediately. An empty sequence forces Idle and emits nothing.
    fn begin(&mut self, origin: SurfaceRole) {
        if self.sequence.as_ref().map_or(true, TokenSequence::is_empty) {
            self.state = PlaybackState::Idle;
            return;
        }
        self.state = PlaybackState::Running;
        if origin == SurfaceRole::Secondary {
            self.hub.notify_primary(SurfaceNotice::Started);
        }
        let rate_ms = self.rate.as_millis() as u64;
        debug!(rate_ms, cursor = self.cursor, "playback started");
        self.hub.broadcast(PlaybackEvent::Started { rate_ms });
        self.next_tick = Some(Instant::now());
    }

    fn stop(&mut self, origin: SurfaceRole) {
        self.next_tick = None;
        self.state = PlaybackState::Idle;
        if origin == SurfaceRole::Secondary {
            self.hub.notify_primary(SurfaceNotice::Stopped);
        }
        debug!(cursor = self.cursor, "playback stopped");
        self.hub.broadcast(PlaybackEvent::Stopped);
    }

    fn set_rate(&mut self, rate_ms: u64) {
        if rate_ms == 0 {
            warn!(rate_ms, "rejecting non-positive rate");
            return;
        }
        // Takes effect from the next scheduled advance; an in-flight delay
        // keeps its original deadline.
        self.rate = Duration::from_millis(rate_ms);
    }

    /// One advance step of the playback loop.
    fn tick(&mut self) {
        self.next_tick = None;
        let Some(sequence) = self.sequence.clone() else {
            return;
        };

        let total = sequence.len();
        if self.cursor < total {
            let Some(word) = sequence.get(self.cursor) else {
                return;
            };
            self.hub.broadcast(PlaybackEvent::Word {
                text: word.to_string(),
                index: self.cursor,
                total,
            });

            let mut delay = self.rate;
            if word.contains('.') {
                delay += Duration::from_millis(PUNCTUATION_PAUSE_MS);
            }

            // Schedule before bumping the cursor so the emitted index is the
            // word just shown.
            self.next_tick = Some(Instant::now() + delay);
            self.cursor += 1;
        } else {
            self.cursor = 0;
            self.state = PlaybackState::Idle;
            debug!("sequence exhausted");
            self.hub.broadcast(PlaybackEvent::Finished);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    fn spawn_engine() -> PlaybackHandle {
        let (engine, handle) = PlaybackEngine::new();
        tokio::spawn(engine.run());
        handle
    }

    fn sequence(words: &[&str]) -> TokenSequence {
        TokenSequence::new(words.iter().map(|w| w.to_string()).collect())
    }

    fn attach_primary(
        handle: &PlaybackHandle,
    ) -> (
        UnboundedReceiver<PlaybackEvent>,
        UnboundedReceiver<SurfaceNotice>,
    ) {
        let (events_tx, events_rx) = unbounded_channel();
        let (notices_tx, notices_rx) = unbounded_channel();
        handle.attach(SurfaceRole::Primary, events_tx, Some(notices_tx));
        (events_rx, notices_rx)
    }

    fn word(text: &str, index: usize, total: usize) -> PlaybackEvent {
        PlaybackEvent::Word {
            text: text.to_string(),
            index,
            total,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn plays_all_words_in_order_with_punctuation_pause() {
        let handle = spawn_engine();
        let (mut events, _notices) = attach_primary(&handle);
        let seq = sequence(&["Hello", "world.", "Goodbye"]);

        let t0 = Instant::now();
        handle.start(seq, 200);

        assert_eq!(
            events.recv().await,
            Some(PlaybackEvent::Started { rate_ms: 200 })
        );
        assert_eq!(events.recv().await, Some(word("Hello", 0, 3)));
        assert_eq!(t0.elapsed(), Duration::ZERO);

        assert_eq!(events.recv().await, Some(word("world.", 1, 3)));
        assert_eq!(t0.elapsed(), Duration::from_millis(200));

        // "world." carries the flat punctuation pause
        assert_eq!(events.recv().await, Some(word("Goodbye", 2, 3)));
        assert_eq!(t0.elapsed(), Duration::from_millis(600));

        assert_eq!(events.recv().await, Some(PlaybackEvent::Finished));
        assert_eq!(t0.elapsed(), Duration::from_millis(800));
    }

    #[tokio::test(start_paused = true)]
    async fn finished_cycle_restarts_from_the_top() {
        let handle = spawn_engine();
        let (mut events, _notices) = attach_primary(&handle);
        let seq = sequence(&["a", "b"]);

        handle.start(seq.clone(), 100);
        while events.recv().await != Some(PlaybackEvent::Finished) {}

        handle.start(seq, 100);
        assert_eq!(
            events.recv().await,
            Some(PlaybackEvent::Started { rate_ms: 100 })
        );
        assert_eq!(events.recv().await, Some(word("a", 0, 2)));
    }

    #[tokio::test(start_paused = true)]
    async fn restart_with_the_same_sequence_resumes_position() {
        let handle = spawn_engine();
        let (mut events, _notices) = attach_primary(&handle);
        let seq = sequence(&["a", "b", "c", "d"]);

        handle.start(seq.clone(), 100);
        assert_eq!(
            events.recv().await,
            Some(PlaybackEvent::Started { rate_ms: 100 })
        );
        assert_eq!(events.recv().await, Some(word("a", 0, 4)));
        assert_eq!(events.recv().await, Some(word("b", 1, 4)));

        handle.stop();
        assert_eq!(events.recv().await, Some(PlaybackEvent::Stopped));

        handle.start(seq, 100);
        assert_eq!(
            events.recv().await,
            Some(PlaybackEvent::Started { rate_ms: 100 })
        );
        assert_eq!(events.recv().await, Some(word("c", 2, 4)));
    }

    #[tokio::test(start_paused = true)]
    async fn starting_a_new_sequence_resets_the_cursor() {
        let handle = spawn_engine();
        let (mut events, _notices) = attach_primary(&handle);

        handle.start(sequence(&["a", "b", "c"]), 100);
        assert_eq!(
            events.recv().await,
            Some(PlaybackEvent::Started { rate_ms: 100 })
        );
        assert_eq!(events.recv().await, Some(word("a", 0, 3)));
        assert_eq!(events.recv().await, Some(word("b", 1, 3)));

        handle.start(sequence(&["x", "y"]), 100);
        assert_eq!(
            events.recv().await,
            Some(PlaybackEvent::Started { rate_ms: 100 })
        );
        assert_eq!(events.recv().await, Some(word("x", 0, 2)));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_while_idle_is_idempotent() {
        let handle = spawn_engine();
        let (mut events, _notices) = attach_primary(&handle);

        handle.stop();
        handle.stop();

        assert_eq!(events.recv().await, Some(PlaybackEvent::Stopped));
        assert_eq!(events.recv().await, Some(PlaybackEvent::Stopped));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_sequence_emits_nothing_but_keeps_the_rate() {
        let handle = spawn_engine();
        let (mut events, _notices) = attach_primary(&handle);

        handle.start(sequence(&[]), 500);
        handle.load(sequence(&["later"]));
        handle.resume();

        // No Started/Finished from the empty start; the resume picks up the
        // rate the empty start recorded.
        assert_eq!(
            events.recv().await,
            Some(PlaybackEvent::Started { rate_ms: 500 })
        );
        assert_eq!(events.recv().await, Some(word("later", 0, 1)));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_rate_start_is_rejected_silently() {
        let handle = spawn_engine();
        let (mut events, _notices) = attach_primary(&handle);

        handle.start(sequence(&["a"]), 0);
        handle.stop();

        assert_eq!(events.recv().await, Some(PlaybackEvent::Stopped));
    }

    #[tokio::test(start_paused = true)]
    async fn resume_without_a_document_is_ignored() {
        let handle = spawn_engine();
        let (mut events, _notices) = attach_primary(&handle);

        handle.resume();
        handle.stop();

        assert_eq!(events.recv().await, Some(PlaybackEvent::Stopped));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_change_applies_from_the_next_advance() {
        let handle = spawn_engine();
        let (mut events, _notices) = attach_primary(&handle);

        let t0 = Instant::now();
        handle.start(sequence(&["a", "b", "c"]), 100);
        assert_eq!(
            events.recv().await,
            Some(PlaybackEvent::Started { rate_ms: 100 })
        );
        assert_eq!(events.recv().await, Some(word("a", 0, 3)));

        // The delay already in flight keeps its deadline; only the one
        // scheduled after it uses the new rate.
        handle.set_rate(300);
        assert_eq!(events.recv().await, Some(word("b", 1, 3)));
        assert_eq!(t0.elapsed(), Duration::from_millis(100));
        assert_eq!(events.recv().await, Some(word("c", 2, 3)));
        assert_eq!(t0.elapsed(), Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn delivers_identical_streams_to_both_surfaces() {
        let handle = spawn_engine();
        let (mut primary, _notices) = attach_primary(&handle);
        let (secondary_tx, mut secondary) = unbounded_channel();
        handle.attach(SurfaceRole::Secondary, secondary_tx, None);

        handle.start(sequence(&["x", "y"]), 50);

        let mut primary_events = Vec::new();
        loop {
            let event = primary.recv().await.expect("engine dropped");
            let done = event == PlaybackEvent::Finished;
            primary_events.push(event);
            if done {
                break;
            }
        }

        let mut secondary_events = Vec::new();
        while let Ok(event) = secondary.try_recv() {
            secondary_events.push(event);
        }

        assert_eq!(primary_events.len(), 4);
        assert_eq!(primary_events, secondary_events);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_surface_does_not_disturb_the_other() {
        let handle = spawn_engine();
        let (mut primary, _notices) = attach_primary(&handle);
        let (secondary_tx, secondary) = unbounded_channel();
        handle.attach(SurfaceRole::Secondary, secondary_tx, None);
        drop(secondary);

        handle.start(sequence(&["a", "b", "c"]), 100);

        let mut words = 0;
        loop {
            match primary.recv().await.expect("engine dropped") {
                PlaybackEvent::Word { .. } => words += 1,
                PlaybackEvent::Finished => break,
                _ => {}
            }
        }
        assert_eq!(words, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn a_new_secondary_replaces_the_previous_one() {
        let handle = spawn_engine();
        let (old_tx, mut old_rx) = unbounded_channel();
        handle.attach(SurfaceRole::Secondary, old_tx, None);
        let (new_tx, mut new_rx) = unbounded_channel();
        handle.attach(SurfaceRole::Secondary, new_tx, None);

        handle.start(sequence(&["solo"]), 100);

        loop {
            match new_rx.recv().await.expect("engine dropped") {
                PlaybackEvent::Finished => break,
                _ => {}
            }
        }
        assert!(old_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn display_commands_notify_the_primary_surface() {
        let handle = spawn_engine();
        let (mut events, mut notices) = attach_primary(&handle);
        handle.load(sequence(&["a", "b"]));

        let display = handle.for_role(SurfaceRole::Secondary);
        display.resume();
        assert_eq!(notices.recv().await, Some(SurfaceNotice::Started));

        display.stop();
        assert_eq!(notices.recv().await, Some(SurfaceNotice::Stopped));
        while events.recv().await != Some(PlaybackEvent::Stopped) {}

        // Primary-issued stop must not echo back a notice
        handle.stop();
        assert_eq!(events.recv().await, Some(PlaybackEvent::Stopped));
        assert!(notices.try_recv().is_err());
    }
}
