pub mod dialogs;
pub mod display;
pub mod reader;
pub mod theme;

pub use dialogs::FileDialogs;
pub use display::DisplayWindow;
pub use reader::{ReaderAction, ReaderWindow, DEFAULT_WPM};
pub use theme::apply_theme;
