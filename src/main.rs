mod core;
mod input;
mod playback;
mod ui;

use input::load_document;
use playback::{PlaybackEngine, PlaybackHandle};
use ui::{apply_theme, DisplayWindow, FileDialogs, ReaderAction, ReaderWindow, DEFAULT_WPM};

use imgui::{Condition, Context, FontConfig, FontSource};
use imgui_winit_support::{HiDpiMode, WinitPlatform};
use winit::event::{Event, WindowEvent};
use winit::event_loop::EventLoop;
use winit::window::WindowBuilder;

use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use glutin_winit::{DisplayBuilder, GlWindow};
use raw_window_handle::HasRawWindowHandle;

use glow::HasContext;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::time::Instant;
use tracing::{error, info, warn};

struct AppState {
    reader: ReaderWindow,
    display: DisplayWindow,
    show_display: bool,
    dark_mode: bool,
    theme_dirty: bool,
    font_path: Option<PathBuf>,
    show_open_pending: bool,
    show_font_pending: bool,
    show_about: bool,
    status_message: Option<String>,
    // Async document loading state
    loading: bool,
    loading_receiver: Option<Receiver<LoadingUpdate>>,
}

/// Messages from the background document loader
enum LoadingUpdate {
    Complete(core::Document),
    Error(String),
}

/// Persistent application settings
#[derive(Serialize, Deserialize)]
#[serde(default)]
struct AppSettings {
    wpm: i32,
    dark_mode: bool,
    font_path: Option<PathBuf>,
    show_display: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            wpm: DEFAULT_WPM,
            dark_mode: false,
            font_path: None,
            show_display: false,
        }
    }
}

impl AppSettings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("one-word-reader").join("settings.json"))
    }

    fn load() -> Self {
        if let Some(path) = Self::config_path() {
            if path.exists() {
                if let Ok(contents) = fs::read_to_string(&path) {
                    if let Ok(settings) = serde_json::from_str(&contents) {
                        return settings;
                    }
                }
            }
        }
        Self::default()
    }

    fn save(&self) {
        if let Some(path) = Self::config_path() {
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            if let Ok(json) = serde_json::to_string_pretty(self) {
                let _ = fs::write(&path, json);
            }
        }
    }
}

impl AppState {
    fn new(playback: PlaybackHandle, settings: AppSettings) -> Self {
        Self {
            reader: ReaderWindow::new(playback.clone(), settings.wpm),
            display: DisplayWindow::new(playback),
            show_display: settings.show_display,
            dark_mode: settings.dark_mode,
            theme_dirty: false,
            font_path: settings.font_path,
            show_open_pending: false,
            show_font_pending: false,
            show_about: false,
            status_message: None,
            loading: false,
            loading_receiver: None,
        }
    }

    fn save_settings(&self) {
        let settings = AppSettings {
            wpm: self.reader.wpm(),
            dark_mode: self.dark_mode,
            font_path: self.font_path.clone(),
            show_display: self.show_display,
        };
        settings.save();
    }

    /// Kick off loading a document on a background thread
    fn import_document(&mut self, path: PathBuf) {
        self.loading = true;
        self.status_message = Some(format!("Loading {}...", path.display()));

        let (tx, rx) = channel();
        self.loading_receiver = Some(rx);

        std::thread::spawn(move || {
            match load_document(&path.to_string_lossy()) {
                Ok(document) => {
                    let _ = tx.send(LoadingUpdate::Complete(document));
                }
                Err(e) => {
                    let _ = tx.send(LoadingUpdate::Error(e.to_string()));
                }
            }
        });
    }

    /// Collect the result of a background load, if one is pending
    fn process_loading(&mut self) {
        let Some(receiver) = self.loading_receiver.take() else {
            return;
        };

        match receiver.try_recv() {
            Ok(LoadingUpdate::Complete(document)) => {
                info!(
                    words = document.tokens.len(),
                    file = %document.file_name,
                    "document loaded"
                );
                self.status_message = Some(format!(
                    "Loaded {} words from {}",
                    document.tokens.len(),
                    document.file_name
                ));
                self.reader.set_document(document);
                self.loading = false;
            }
            Ok(LoadingUpdate::Error(e)) => {
                error!("failed to load document: {}", e);
                self.status_message = Some(format!("Failed to load document: {}", e));
                self.loading = false;
            }
            Err(TryRecvError::Empty) => {
                self.loading_receiver = Some(receiver);
            }
            Err(TryRecvError::Disconnected) => {
                self.loading = false;
            }
        }
    }

    fn process_file_dialogs(&mut self) {
        if self.show_open_pending {
            if let Some(path) = FileDialogs::open_document() {
                self.import_document(path);
            }
            self.show_open_pending = false;
        }

        if self.show_font_pending {
            if let Some(path) = FileDialogs::open_font() {
                self.font_path = Some(path);
                self.status_message = Some("Font saved; it applies on the next launch".to_string());
                self.save_settings();
            }
            self.show_font_pending = false;
        }
    }

    fn toggle_dark(&mut self) {
        self.dark_mode = !self.dark_mode;
        self.theme_dirty = true;
        self.save_settings();
    }
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load persisted settings
    let settings = AppSettings::load();

    // Tokio runtime hosting the playback engine task
    let rt = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");
    let (engine, playback) = PlaybackEngine::new();
    rt.spawn(engine.run());

    // Create event loop
    let event_loop = EventLoop::new().expect("Failed to create EventLoop");

    // Build the window and GL display using glutin-winit
    let (window, gl_config) = DisplayBuilder::new()
        .with_window_builder(Some(
            WindowBuilder::new()
                .with_title("One Word Reader")
                .with_inner_size(winit::dpi::LogicalSize::new(920.0, 640.0)),
        ))
        .build(
            &event_loop,
            glutin::config::ConfigTemplateBuilder::new(),
            |mut iter| iter.next().unwrap(),
        )
        .expect("Failed to create window and display");

    let window = window.expect("Failed to create window");
    let gl_display = gl_config.display();

    let context = unsafe {
        gl_display.create_context(
            &gl_config,
            &glutin::context::ContextAttributesBuilder::new()
                .build(Some(window.raw_window_handle())),
        )
    }
    .expect("Failed to create GL context");

    let attrs = window.build_surface_attributes(
        glutin::surface::SurfaceAttributesBuilder::<glutin::surface::WindowSurface>::new(),
    );

    let surface = unsafe { gl_display.create_window_surface(&gl_config, &attrs) }
        .expect("Failed to create surface");

    let context = context
        .make_current(&surface)
        .expect("Failed to make context current");

    let gl = unsafe {
        glow::Context::from_loader_function(|ptr| {
            gl_display.get_proc_address(&std::ffi::CString::new(ptr).unwrap()) as *const _
        })
    };

    // Set up imgui
    let mut imgui = Context::create();
    imgui.set_log_filename(None::<std::path::PathBuf>);

    // Keep window layout across runs
    let ini_path = dirs::config_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("one-word-reader")
        .join("layout.ini");
    if let Some(parent) = ini_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    imgui.set_ini_filename(Some(ini_path));

    // Enable docking
    imgui.io_mut().config_flags |= imgui::ConfigFlags::DOCKING_ENABLE;

    apply_theme(&mut imgui, settings.dark_mode);

    // Configure fonts; a user-selected font replaces the default for the
    // whole atlas (the atlas is built before the renderer, so changes apply
    // at the next launch)
    let hidpi_factor = window.scale_factor();
    let font_size = (16.0 * hidpi_factor) as f32;
    let user_font_data = settings.font_path.as_ref().and_then(|p| match fs::read(p) {
        Ok(data) => Some(data),
        Err(e) => {
            warn!("could not read font {}: {}", p.display(), e);
            None
        }
    });
    match &user_font_data {
        Some(data) => {
            imgui.fonts().add_font(&[FontSource::TtfData {
                data: data.as_slice(),
                size_pixels: font_size,
                config: Some(FontConfig {
                    size_pixels: font_size,
                    ..FontConfig::default()
                }),
            }]);
        }
        None => {
            imgui.fonts().add_font(&[FontSource::DefaultFontData {
                config: Some(FontConfig {
                    size_pixels: font_size,
                    ..FontConfig::default()
                }),
            }]);
        }
    }
    imgui.io_mut().font_global_scale = (1.0 / hidpi_factor) as f32;

    // Set up platform and renderer
    let mut platform = WinitPlatform::init(&mut imgui);
    platform.attach_window(imgui.io_mut(), &window, HiDpiMode::Default);

    let mut renderer = imgui_glow_renderer::AutoRenderer::initialize(gl, &mut imgui)
        .expect("Failed to initialize renderer");

    // Second glow context for clearing (references the same GL context)
    let gl_clear = unsafe {
        glow::Context::from_loader_function(|ptr| {
            gl_display.get_proc_address(&std::ffi::CString::new(ptr).unwrap()) as *const _
        })
    };

    let mut state = AppState::new(playback, settings);
    let mut last_frame_time = Instant::now();
    let mut last_settings_save = Instant::now();

    // Main loop
    event_loop
        .run(move |event, window_target| {
            match event {
                Event::NewEvents(_) => {
                    let now = Instant::now();
                    imgui.io_mut().update_delta_time(now - last_frame_time);
                    last_frame_time = now;
                }
                Event::AboutToWait => {
                    state.process_file_dialogs();
                    state.process_loading();

                    // Drain engine events into the surfaces
                    state.reader.process_events();

                    // The display window reopens whenever playback is live,
                    // matching the reader's companion-window behavior
                    if state.reader.is_playing() && !state.show_display {
                        state.show_display = true;
                    }
                    if state.show_display && !state.display.is_attached() {
                        state.display.attach();
                    }
                    if !state.show_display && state.display.is_attached() {
                        state.display.detach();
                    }
                    state.display.process_events();

                    if state.theme_dirty {
                        apply_theme(&mut imgui, state.dark_mode);
                        state.theme_dirty = false;
                    }

                    // Save settings periodically (every 30 seconds)
                    if last_settings_save.elapsed().as_secs() >= 30 {
                        state.save_settings();
                        last_settings_save = Instant::now();
                    }

                    platform
                        .prepare_frame(imgui.io_mut(), &window)
                        .expect("Failed to prepare frame");
                    window.request_redraw();
                }
                Event::WindowEvent {
                    event: WindowEvent::RedrawRequested,
                    ..
                } => {
                    let ui = imgui.new_frame();

                    // Menu bar
                    ui.main_menu_bar(|| {
                        ui.menu("File", || {
                            if ui.menu_item("Open Document...") {
                                state.show_open_pending = true;
                            }
                            if ui.menu_item("Select Font...") {
                                state.show_font_pending = true;
                            }
                            ui.separator();
                            if ui.menu_item("Exit") {
                                window_target.exit();
                            }
                        });

                        ui.menu("Playback", || {
                            if ui.menu_item("Start") {
                                state.reader.start();
                            }
                            if ui.menu_item("Stop") {
                                state.reader.stop();
                            }
                            ui.separator();
                            ui.text(format!("Speed: {} wpm", state.reader.wpm()));
                        });

                        ui.menu("View", || {
                            let _tok = if state.show_display {
                                Some(ui.push_style_color(
                                    imgui::StyleColor::Text,
                                    [0.0, 1.0, 0.0, 1.0],
                                ))
                            } else {
                                None
                            };
                            if ui.menu_item("Display Window") {
                                state.show_display = !state.show_display;
                                state.save_settings();
                            }
                            drop(_tok);

                            let _tok = if state.dark_mode {
                                Some(ui.push_style_color(
                                    imgui::StyleColor::Text,
                                    [0.0, 1.0, 0.0, 1.0],
                                ))
                            } else {
                                None
                            };
                            if ui.menu_item("Night Mode") {
                                state.toggle_dark();
                            }
                            drop(_tok);
                        });

                        ui.menu("Help", || {
                            if ui.menu_item("About One Word Reader") {
                                state.show_about = true;
                            }
                        });
                    });

                    // Status bar
                    let window_size = window.inner_size();
                    ui.set_cursor_pos([
                        0.0,
                        window_size.height as f32 / hidpi_factor as f32 - 25.0,
                    ]);
                    ui.child_window("Status")
                        .size([window_size.width as f32 / hidpi_factor as f32, 25.0])
                        .build(|| {
                            if state.loading {
                                ui.text_colored([1.0, 0.8, 0.3, 1.0], "Loading...");
                            } else if let Some(ref msg) = state.status_message {
                                ui.text(msg);
                            } else if let Some(document) = state.reader.document() {
                                ui.text(format!(
                                    "{} | {} words | {} wpm",
                                    document.file_name,
                                    document.tokens.len(),
                                    state.reader.wpm()
                                ));
                            } else {
                                ui.text("Import a document to begin (File > Open Document...)");
                            }
                        });

                    // Dockspace over the main viewport so windows can be
                    // rearranged but stay within the app
                    ui.dockspace_over_main_viewport();

                    let action = state.reader.render(ui, state.dark_mode);
                    match action {
                        ReaderAction::ImportDocument => state.show_open_pending = true,
                        ReaderAction::SelectFont => state.show_font_pending = true,
                        ReaderAction::ToggleDark => state.toggle_dark(),
                        ReaderAction::None => {}
                    }

                    if state.show_display {
                        state.display.render(ui, &mut state.show_display);
                    }

                    if state.show_about {
                        ui.window("About One Word Reader")
                            .size([380.0, 130.0], Condition::FirstUseEver)
                            .opened(&mut state.show_about)
                            .build(|| {
                                ui.text("One Word Reader");
                                ui.text(concat!("Version ", env!("CARGO_PKG_VERSION")));
                                ui.separator();
                                ui.text("Reads a document one word at a time.");
                            });
                    }

                    // Prepare and render
                    platform.prepare_render(ui, &window);
                    let draw_data = imgui.render();

                    unsafe {
                        gl_clear.clear_color(0.1, 0.1, 0.1, 1.0);
                        gl_clear.clear(glow::COLOR_BUFFER_BIT);
                    }

                    renderer.render(draw_data).expect("Rendering failed");

                    surface
                        .swap_buffers(&context)
                        .expect("Failed to swap buffers");
                }
                Event::WindowEvent {
                    event: WindowEvent::CloseRequested,
                    ..
                } => {
                    state.save_settings();
                    window_target.exit();
                }
                _ => {}
            }

            platform.handle_event(imgui.io_mut(), &window, &event);
        })
        .expect("EventLoop error");
}
