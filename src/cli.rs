use std::path::PathBuf;

use clap::Parser;

/// Command-line flags. An explicit value here wins over the persisted
/// config for the same field.
#[derive(Parser, Debug)]
#[command(
    name = "shortcutshare",
    about = "ShortcutShare — share one file and collect uploads over local HTTP",
    version,
    author
)]
pub struct Cli {
    /// Port to listen on
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// File to serve for download (skips the file picker)
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Directory to save uploaded files to
    #[arg(short, long)]
    pub directory: Option<PathBuf>,

    /// Do not serve any files, ignores the file picker
    #[arg(short = 'x', long)]
    pub no_serve: bool,

    /// Do not allow uploading via POST
    #[arg(short = 'u', long)]
    pub no_upload: bool,

    /// Do not save resolved settings to the config file
    #[arg(short = 's', long)]
    pub no_save: bool,
}
