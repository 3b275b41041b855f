use imgui::{Condition, Ui};
use tokio::sync::mpsc;

use crate::core::Document;
use crate::playback::{PlaybackEvent, PlaybackHandle, SurfaceNotice, SurfaceRole};

/// Default words-per-minute
pub const DEFAULT_WPM: i32 = 300;
const MIN_WPM: i32 = 100;
const MAX_WPM: i32 = 900;

/// Actions the reader window asks the host to perform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReaderAction {
    None,
    ImportDocument,
    SelectFont,
    ToggleDark,
}

/// Primary control surface: import, speed, start/stop and progress.
///
/// Holds no copy of the engine's cursor; the index shown is whatever the
/// event stream last reported.
pub struct ReaderWindow {
    handle: PlaybackHandle,
    events: mpsc::UnboundedReceiver<PlaybackEvent>,
    notices: mpsc::UnboundedReceiver<SurfaceNotice>,
    document: Option<Document>,
    wpm: i32,
    current_index: Option<usize>,
    is_playing: bool,
}

impl ReaderWindow {
    pub fn new(handle: PlaybackHandle, wpm: i32) -> Self {
        let (events_tx, events) = mpsc::unbounded_channel();
        let (notices_tx, notices) = mpsc::unbounded_channel();
        handle.attach(SurfaceRole::Primary, events_tx, Some(notices_tx));

        Self {
            handle: handle.for_role(SurfaceRole::Primary),
            events,
            notices,
            document: None,
            wpm: wpm.clamp(MIN_WPM, MAX_WPM),
            current_index: None,
            is_playing: false,
        }
    }

    pub fn wpm(&self) -> i32 {
        self.wpm
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    fn rate_ms(&self) -> u64 {
        60_000 / self.wpm.max(1) as u64
    }

    /// Install a freshly imported document and hand it to the engine
    pub fn set_document(&mut self, document: Document) {
        self.handle.load(document.tokens.clone());
        self.current_index = None;
        self.document = Some(document);
    }

    pub fn start(&mut self) {
        if let Some(document) = &self.document {
            if !document.tokens.is_empty() {
                self.handle.start(document.tokens.clone(), self.rate_ms());
                self.is_playing = true;
            }
        }
    }

    pub fn stop(&mut self) {
        self.handle.stop();
        self.is_playing = false;
    }

    /// Drain pending engine events and display notices; call once per frame
    pub fn process_events(&mut self) {
        while let Ok(notice) = self.notices.try_recv() {
            match notice {
                SurfaceNotice::Started => self.is_playing = true,
                SurfaceNotice::Stopped => self.is_playing = false,
            }
        }
        while let Ok(event) = self.events.try_recv() {
            match event {
                PlaybackEvent::Started { .. } => {}
                PlaybackEvent::Word { index, .. } => self.current_index = Some(index),
                PlaybackEvent::Finished => {
                    self.is_playing = false;
                    self.current_index = None;
                }
                PlaybackEvent::Stopped => self.is_playing = false,
            }
        }
    }

    /// Render the window; returns an action for the host to perform
    pub fn render(&mut self, ui: &Ui, dark: bool) -> ReaderAction {
        let mut action = ReaderAction::None;

        ui.window("Reader")
            .size([420.0, 330.0], Condition::FirstUseEver)
            .position([20.0, 40.0], Condition::FirstUseEver)
            .build(|| {
                if ui.button("Import Document...") {
                    action = ReaderAction::ImportDocument;
                }
                ui.same_line();
                if ui.button(if dark { "Light Mode" } else { "Night Mode" }) {
                    action = ReaderAction::ToggleDark;
                }
                ui.same_line();
                if ui.button("Change Font...") {
                    action = ReaderAction::SelectFont;
                }

                ui.separator();

                let mut wpm = self.wpm;
                if ui.slider("Speed (wpm)", MIN_WPM, MAX_WPM, &mut wpm) {
                    self.wpm = wpm;
                    self.handle.set_rate(self.rate_ms());
                }

                ui.separator();

                let can_start = !self.is_playing
                    && self
                        .document
                        .as_ref()
                        .map_or(false, |d| !d.tokens.is_empty());
                if ui.button("Start") && can_start {
                    self.start();
                }
                ui.same_line();
                if ui.button("Stop") && self.is_playing {
                    self.stop();
                }
                ui.same_line();
                ui.text(if self.is_playing { "Reading..." } else { "Idle" });

                ui.separator();

                let total = self
                    .document
                    .as_ref()
                    .map_or(0, |d| d.tokens.len());
                ui.text(format!(
                    "Loaded file: {}",
                    self.document
                        .as_ref()
                        .map_or("None", |d| d.file_name.as_str())
                ));
                ui.text(format!("Words loaded: {}", total));
                ui.text(format!(
                    "Current word: {}",
                    self.current_index.map_or(0, |i| i + 1)
                ));
                if let Some(document) = &self.document {
                    ui.text_disabled(format!(
                        "Loaded at {}",
                        document.loaded_at.format("%H:%M:%S")
                    ));
                }
            });

        action
    }
}
