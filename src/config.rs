use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::error::AppError;
use crate::picker::FilePicker;

/// Listen port used when neither a flag nor the config supplies one.
pub const DEFAULT_PORT: u16 = 3000;
/// Upload directory used when neither a flag nor the config supplies one.
pub const DEFAULT_DIRECTORY: &str = "./ShortcutShare";
/// Config file path, relative to the working directory.
pub const CONFIG_FILE: &str = "config.json";
/// Request body cap for multipart uploads (32 MiB).
pub const MULTIPART_BUFFER_LIMIT: usize = 32 * 1024 * 1024;

/// On-disk record of previously resolved values.
///
/// Missing fields deserialize as zero/empty and count as absent during
/// resolution, so partial files from older runs still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedConfig {
    pub port: u16,
    pub directory: String,
}

/// Resolved runtime configuration. Built once at startup, immutable after.
#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub directory: PathBuf,
    pub target_file: Option<PathBuf>,
    pub upload_disabled: bool,
    pub serve_disabled: bool,
    pub persist_disabled: bool,
}

impl Settings {
    /// Merge CLI flags, the persisted config and built-in defaults into
    /// final settings, then write the result back unless saving is
    /// disabled. Per-field precedence: flag, then persisted value, then
    /// default.
    ///
    /// The only fatal outcome is a failed config write while saving is
    /// enabled; everything else degrades to defaults with a log line.
    pub fn resolve(
        cli: &Cli,
        picker: &dyn FilePicker,
        config_path: &Path,
    ) -> Result<Self, AppError> {
        let (target_file, serve_disabled) = select_target(cli, picker);

        let persisted = load_persisted(config_path);
        let (port, directory) = merge(cli.port, cli.directory.as_deref(), persisted.as_ref());

        let settings = Settings {
            port,
            directory,
            target_file,
            upload_disabled: cli.no_upload,
            serve_disabled,
            persist_disabled: cli.no_save,
        };

        if settings.persist_disabled {
            tracing::info!("Saving config disabled.");
        } else {
            save_persisted(
                config_path,
                &PersistedConfig {
                    port: settings.port,
                    directory: settings.directory.to_string_lossy().into_owned(),
                },
            )?;
        }

        Ok(settings)
    }
}

/// Pick the file to serve: the `--file` flag wins, otherwise the injected
/// picker runs once. `--no-serve` or a cancelled dialog puts the server in
/// upload-only mode.
fn select_target(cli: &Cli, picker: &dyn FilePicker) -> (Option<PathBuf>, bool) {
    if cli.no_serve {
        return (None, true);
    }

    if let Some(file) = &cli.file {
        tracing::info!("Serving file: {}", file.display());
        return (Some(file.clone()), false);
    }

    let start_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    match picker.pick_file(&start_dir) {
        Some(file) => {
            tracing::info!("Serving file: {}", file.display());
            (Some(file), false)
        }
        None => {
            tracing::info!("No file specified. Upload only enabled.");
            (None, true)
        }
    }
}

/// Read the persisted config. A missing, unreadable or malformed file is
/// treated as absent; the latter two are reported rather than silently
/// dropped.
fn load_persisted(path: &Path) -> Option<PersistedConfig> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("No config file found, creating.");
            return None;
        }
        Err(e) => {
            tracing::warn!("Config at {} could not be read: {}", path.display(), e);
            return None;
        }
    };

    match serde_json::from_str(&contents) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("Config at {} is malformed, ignoring it: {}", path.display(), e);
            None
        }
    }
}

/// Write the resolved values back, create-or-overwrite, indented for
/// hand-editing.
fn save_persisted(path: &Path, config: &PersistedConfig) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(config).unwrap();
    fs::write(path, json).map_err(|source| AppError::ConfigWrite {
        path: path.to_path_buf(),
        source,
    })
}

fn merge(
    cli_port: Option<u16>,
    cli_dir: Option<&Path>,
    persisted: Option<&PersistedConfig>,
) -> (u16, PathBuf) {
    let port = cli_port
        .or_else(|| persisted.map(|p| p.port).filter(|&p| p != 0))
        .unwrap_or(DEFAULT_PORT);

    let directory = cli_dir
        .map(Path::to_path_buf)
        .or_else(|| {
            persisted
                .map(|p| p.directory.as_str())
                .filter(|d| !d.is_empty())
                .map(PathBuf::from)
        })
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DIRECTORY));

    (port, directory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct StubPicker(Option<PathBuf>);

    impl FilePicker for StubPicker {
        fn pick_file(&self, _start_dir: &Path) -> Option<PathBuf> {
            self.0.clone()
        }
    }

    /// Fails the test if the dialog is consulted at all.
    struct PanicPicker;

    impl FilePicker for PanicPicker {
        fn pick_file(&self, _start_dir: &Path) -> Option<PathBuf> {
            panic!("picker must not run");
        }
    }

    fn cli(port: Option<u16>, directory: Option<&str>) -> Cli {
        Cli {
            port,
            file: Some(PathBuf::from("served.txt")),
            directory: directory.map(PathBuf::from),
            no_serve: false,
            no_upload: false,
            no_save: false,
        }
    }

    fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.json");
        fs::write(&path, contents).unwrap();
        path
    }

    // ── Precedence ───────────────────────────────────────────────────

    #[test]
    fn flag_wins_over_persisted_and_default() {
        let persisted = PersistedConfig {
            port: 4000,
            directory: "from-config".to_string(),
        };

        let (port, directory) = merge(Some(9999), Some(Path::new("from-flag")), Some(&persisted));

        assert_eq!(port, 9999);
        assert_eq!(directory, PathBuf::from("from-flag"));
    }

    #[test]
    fn persisted_wins_over_default() {
        let persisted = PersistedConfig {
            port: 4000,
            directory: "from-config".to_string(),
        };

        let (port, directory) = merge(None, None, Some(&persisted));

        assert_eq!(port, 4000);
        assert_eq!(directory, PathBuf::from("from-config"));
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let (port, directory) = merge(None, None, None);

        assert_eq!(port, DEFAULT_PORT);
        assert_eq!(directory, PathBuf::from(DEFAULT_DIRECTORY));
    }

    #[test]
    fn precedence_is_per_field() {
        // Flag for the port only; the directory still comes from the config.
        let persisted = PersistedConfig {
            port: 4000,
            directory: "from-config".to_string(),
        };

        let (port, directory) = merge(Some(9999), None, Some(&persisted));

        assert_eq!(port, 9999);
        assert_eq!(directory, PathBuf::from("from-config"));
    }

    #[test]
    fn zero_port_in_persisted_config_counts_as_absent() {
        let persisted = PersistedConfig {
            port: 0,
            directory: "from-config".to_string(),
        };

        let (port, _) = merge(None, None, Some(&persisted));

        assert_eq!(port, DEFAULT_PORT);
    }

    #[test]
    fn empty_directory_in_persisted_config_counts_as_absent() {
        let persisted = PersistedConfig {
            port: 4000,
            directory: String::new(),
        };

        let (_, directory) = merge(None, None, Some(&persisted));

        assert_eq!(directory, PathBuf::from(DEFAULT_DIRECTORY));
    }

    // ── Persistence ──────────────────────────────────────────────────

    #[test]
    fn first_run_writes_the_resolved_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let settings =
            Settings::resolve(&cli(Some(8080), Some("incoming")), &PanicPicker, &path).unwrap();

        assert_eq!(settings.port, 8080);
        let written = fs::read_to_string(&path).unwrap();
        let parsed: PersistedConfig = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed.port, 8080);
        assert_eq!(parsed.directory, "incoming");
        // Human-readable formatting, not a single line.
        assert!(written.contains('\n'));
    }

    #[test]
    fn resolve_reads_back_previously_persisted_values() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{ "port": 4321, "directory": "saved-dir" }"#);

        let settings = Settings::resolve(&cli(None, None), &PanicPicker, &path).unwrap();

        assert_eq!(settings.port, 4321);
        assert_eq!(settings.directory, PathBuf::from("saved-dir"));
    }

    #[test]
    fn malformed_config_falls_back_to_flags_and_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "{ not json at all");

        let settings = Settings::resolve(&cli(Some(8080), None), &PanicPicker, &path).unwrap();

        assert_eq!(settings.port, 8080);
        assert_eq!(settings.directory, PathBuf::from(DEFAULT_DIRECTORY));
        // The corrupt file gets overwritten with the resolved values.
        let parsed: PersistedConfig =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.port, 8080);
    }

    #[test]
    fn partial_config_loads_with_missing_fields_absent() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{ "port": 4000 }"#);

        let settings = Settings::resolve(&cli(None, None), &PanicPicker, &path).unwrap();

        assert_eq!(settings.port, 4000);
        assert_eq!(settings.directory, PathBuf::from(DEFAULT_DIRECTORY));
    }

    #[test]
    fn no_save_leaves_no_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let mut args = cli(Some(8080), None);
        args.no_save = true;

        let settings = Settings::resolve(&args, &PanicPicker, &path).unwrap();

        assert!(settings.persist_disabled);
        assert!(!path.exists());
    }

    #[test]
    fn unwritable_config_path_is_a_startup_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no-such-subdir").join("config.json");

        let result = Settings::resolve(&cli(None, None), &PanicPicker, &path);

        assert!(matches!(result, Err(AppError::ConfigWrite { .. })));
    }

    // ── Target selection ─────────────────────────────────────────────

    #[test]
    fn file_flag_skips_the_picker() {
        let (target, serve_disabled) = select_target(&cli(None, None), &PanicPicker);

        assert_eq!(target, Some(PathBuf::from("served.txt")));
        assert!(!serve_disabled);
    }

    #[test]
    fn no_serve_skips_the_picker_and_disables_serving() {
        let mut args = cli(None, None);
        args.file = None;
        args.no_serve = true;

        let (target, serve_disabled) = select_target(&args, &PanicPicker);

        assert_eq!(target, None);
        assert!(serve_disabled);
    }

    #[test]
    fn picker_choice_becomes_the_target() {
        let mut args = cli(None, None);
        args.file = None;

        let (target, serve_disabled) =
            select_target(&args, &StubPicker(Some(PathBuf::from("picked.bin"))));

        assert_eq!(target, Some(PathBuf::from("picked.bin")));
        assert!(!serve_disabled);
    }

    #[test]
    fn cancelled_picker_enables_upload_only_mode() {
        let mut args = cli(None, None);
        args.file = None;

        let (target, serve_disabled) = select_target(&args, &StubPicker(None));

        assert_eq!(target, None);
        assert!(serve_disabled);
    }
}
