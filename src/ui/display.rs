use imgui::{Condition, Ui};
use tokio::sync::mpsc;

use crate::playback::{PlaybackEvent, PlaybackHandle, SurfaceRole};

/// Secondary display surface: renders only the current word, large, plus its
/// own start/stop controls.
///
/// Attached to the engine only while visible; closing the window drops the
/// receiver, so events still in flight are discarded harmlessly.
pub struct DisplayWindow {
    handle: PlaybackHandle,
    events: Option<mpsc::UnboundedReceiver<PlaybackEvent>>,
    word: String,
    index: usize,
    total: usize,
    wpm: u64,
    is_playing: bool,
}

impl DisplayWindow {
    pub fn new(handle: PlaybackHandle) -> Self {
        Self {
            handle: handle.for_role(SurfaceRole::Secondary),
            events: None,
            word: String::new(),
            index: 0,
            total: 0,
            wpm: 0,
            is_playing: false,
        }
    }

    /// Register with the engine; called when the window becomes visible
    pub fn attach(&mut self) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        self.handle.attach(SurfaceRole::Secondary, events_tx, None);
        self.events = Some(events_rx);
    }

    /// Unregister from delivery
    pub fn detach(&mut self) {
        self.handle.detach(SurfaceRole::Secondary);
        self.events = None;
        self.is_playing = false;
    }

    pub fn is_attached(&self) -> bool {
        self.events.is_some()
    }

    /// Drain pending engine events; call once per frame while attached
    pub fn process_events(&mut self) {
        let Some(events) = &mut self.events else {
            return;
        };
        while let Ok(event) = events.try_recv() {
            match event {
                PlaybackEvent::Started { rate_ms } => {
                    self.wpm = if rate_ms > 0 {
                        (60_000 + rate_ms / 2) / rate_ms
                    } else {
                        0
                    };
                    self.is_playing = true;
                }
                PlaybackEvent::Word { text, index, total } => {
                    self.word = text;
                    self.index = index;
                    self.total = total;
                    // A word can only arrive while playback is running; this
                    // covers a window attached after the start event went out
                    self.is_playing = true;
                }
                PlaybackEvent::Finished => self.is_playing = false,
                PlaybackEvent::Stopped => self.is_playing = false,
            }
        }
    }

    pub fn render(&mut self, ui: &Ui, opened: &mut bool) {
        ui.window("Display")
            .size([400.0, 300.0], Condition::FirstUseEver)
            .position([470.0, 40.0], Condition::FirstUseEver)
            .opened(opened)
            .build(|| {
                let avail = ui.content_region_avail();

                ui.set_window_font_scale(2.5);
                let text_size = ui.calc_text_size(&self.word);
                let cursor = ui.cursor_pos();
                ui.set_cursor_pos([
                    cursor[0] + (avail[0] - text_size[0]).max(0.0) / 2.0,
                    cursor[1] + (avail[1] / 2.0 - text_size[1]).max(0.0) / 2.0,
                ]);
                ui.text(&self.word);
                ui.set_window_font_scale(1.0);

                ui.set_cursor_pos([cursor[0], cursor[1] + avail[1] / 2.0 + 20.0]);
                ui.separator();
                if self.total > 0 {
                    ui.text(format!("Word {} of {}", self.index + 1, self.total));
                } else {
                    ui.text("No document");
                }
                ui.text(format!("{} wpm", self.wpm));

                if self.is_playing {
                    if ui.button("Stop") {
                        self.handle.stop();
                        self.is_playing = false;
                    }
                } else if ui.button("Start") {
                    self.handle.resume();
                }
            });
    }
}
