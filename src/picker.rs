use std::path::{Path, PathBuf};

/// Interactive chooser for the file to serve.
///
/// The dialog is an external OS collaborator, so it sits behind a trait
/// and startup logic stays testable in headless environments. `None`
/// means the user cancelled.
pub trait FilePicker {
    fn pick_file(&self, start_dir: &Path) -> Option<PathBuf>;
}

/// Native file dialog, shown once at startup.
pub struct NativeDialog;

impl FilePicker for NativeDialog {
    fn pick_file(&self, start_dir: &Path) -> Option<PathBuf> {
        rfd::FileDialog::new().set_directory(start_dir).pick_file()
    }
}
