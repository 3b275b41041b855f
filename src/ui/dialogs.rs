use rfd::FileDialog;
use std::path::PathBuf;

/// File dialog helper for One Word Reader
pub struct FileDialogs;

impl FileDialogs {
    /// Pick a document to read
    pub fn open_document() -> Option<PathBuf> {
        FileDialog::new()
            .add_filter("Markdown", &["md", "markdown"])
            .add_filter("Text Files", &["txt"])
            .add_filter("All Files", &["*"])
            .set_title("Open Document")
            .pick_file()
    }

    /// Pick a display font
    pub fn open_font() -> Option<PathBuf> {
        FileDialog::new()
            .add_filter("Fonts", &["ttf", "otf"])
            .set_title("Select Font")
            .pick_file()
    }
}
