//! Config file discovery and loading.
//!
//! [`discover`] reads event tables from an application root in this order,
//! merging each additively into the previous ones:
//! 1. `{root}/config/event.toml` (application)
//! 2. `{root}/plugin/{name}/config/event.toml` (app plugins, by name)
//! 3. `{root}/vendor/{vendor}/{plugin}/config/event.toml` (vendor plugins,
//!    by vendor then plugin)
//!
//! Missing files are skipped. Unreadable or malformed files abort loading.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::types::{CallbackDescriptor, EventConfig, EventTable, LogSection};

/// File name of an event configuration inside a `config/` directory.
pub const EVENT_CONFIG_FILE: &str = "event.toml";

/// Environment variable that supplies the log level when no file sets one.
pub const LOG_LEVEL_ENV: &str = "TRIAD_LOG";

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Result of [`discover`].
#[derive(Debug, Clone, Default)]
pub struct Discovered {
    /// All sources merged in load order.
    pub config: EventConfig,
    /// Files that were found and loaded, in load order.
    pub loaded_files: Vec<PathBuf>,
}

/// Parse a configuration document.
///
/// `source_name` is used in error messages only.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the TOML is malformed, an `[event]` entry is
/// not a list, or a callback entry has no callable shape.
pub fn load_str(source_name: &str, text: &str) -> ConfigResult<EventConfig> {
    let mut doc: toml::Table = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: source_name.to_owned(),
        source: e,
    })?;

    let events = match doc.remove("event") {
        Some(toml::Value::Table(table)) => parse_event_table(source_name, table)?,
        Some(_) => {
            return Err(ConfigError::ValidationError {
                field: "event".to_owned(),
                message: format!("in {source_name}: expected a table of event names"),
            });
        },
        None => EventTable::new(),
    };

    let log: LogSection = match doc.remove("log") {
        Some(value) => value.try_into().map_err(|e| ConfigError::ParseError {
            path: source_name.to_owned(),
            source: e,
        })?,
        None => LogSection::default(),
    };

    for key in doc.keys() {
        warn!(source = source_name, key = %key, "ignoring unknown config section");
    }

    Ok(EventConfig { events, log })
}

fn parse_event_table(source_name: &str, table: toml::Table) -> ConfigResult<EventTable> {
    let mut events = EventTable::new();

    for (event, value) in table {
        if event.is_empty() {
            return Err(ConfigError::ValidationError {
                field: "event".to_owned(),
                message: format!("in {source_name}: event names must not be empty"),
            });
        }

        let toml::Value::Array(items) = value else {
            return Err(ConfigError::InvalidEventTable {
                path: source_name.to_owned(),
                event,
            });
        };

        let mut callbacks = Vec::with_capacity(items.len());
        for item in items {
            let descriptor: CallbackDescriptor = item.clone().try_into().map_err(
                |_: toml::de::Error| ConfigError::NotCallable {
                    event: event.clone(),
                    descriptor: item.to_string(),
                },
            )?;
            callbacks.push(descriptor);
        }

        events.extend(event, callbacks);
    }

    Ok(events)
}

/// Load a single config file (no discovery, no environment fallbacks).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, is too large, or
/// fails to parse.
pub fn load_file(path: &Path) -> ConfigResult<EventConfig> {
    // Check file size before reading to prevent OOM.
    let metadata = std::fs::metadata(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    check_size(path, metadata.len())?;

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    load_str(&path.display().to_string(), &content)
}

/// Discover and merge every event configuration under `root`.
///
/// Applies environment fallbacks from the process environment.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any existing file cannot be read or parsed.
pub fn discover(root: &Path) -> ConfigResult<Discovered> {
    discover_with_env(root, &collect_env_vars())
}

/// [`discover`] with an explicit environment, for callers that resolve the
/// environment themselves.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any existing file cannot be read or parsed.
pub fn discover_with_env(
    root: &Path,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<Discovered> {
    let mut discovered = Discovered::default();

    for path in candidate_files(root)? {
        if let Some(config) = try_load_file(&path)? {
            info!(
                path = %path.display(),
                events = config.events.len(),
                callbacks = config.events.callback_count(),
                "loaded event config"
            );
            discovered.config.merge(config);
            discovered.loaded_files.push(path);
        }
    }

    if apply_env_fallbacks(&mut discovered.config, env_vars) > 0 {
        debug!("applied environment variable fallbacks");
    }

    Ok(discovered)
}

/// Config file locations under `root`, in load order.
fn candidate_files(root: &Path) -> ConfigResult<Vec<PathBuf>> {
    let config_file = |dir: &Path| dir.join("config").join(EVENT_CONFIG_FILE);

    let mut files = vec![config_file(root)];
    for plugin in sorted_subdirs(&root.join("plugin"))? {
        files.push(config_file(&plugin));
    }
    for vendor in sorted_subdirs(&root.join("vendor"))? {
        for plugin in sorted_subdirs(&vendor)? {
            files.push(config_file(&plugin));
        }
    }
    Ok(files)
}

/// Subdirectories of `dir` sorted by name; empty if `dir` does not exist.
fn sorted_subdirs(dir: &Path) -> ConfigResult<Vec<PathBuf>> {
    let read_error = |e: std::io::Error| ConfigError::ReadError {
        path: dir.display().to_string(),
        source: e,
    };

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(read_error(e)),
    };

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(read_error)?;
        if entry.file_type().map_err(read_error)?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Try to load a file, returning `None` if the file doesn't exist.
///
/// Uses a single read operation so the file cannot change between the
/// existence check and the read.
fn try_load_file(path: &Path) -> ConfigResult<Option<EventConfig>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "event config not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    check_size(path, content.len() as u64)?;
    load_str(&path.display().to_string(), &content).map(Some)
}

fn check_size(path: &Path, len: u64) -> ConfigResult<()> {
    if len > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {len} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit"
            ),
        });
    }
    Ok(())
}

/// Snapshot of the `TRIAD_*` environment variables.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with("TRIAD_"))
        .collect()
}

/// Fill unset fields from the environment. Returns how many were applied.
pub fn apply_env_fallbacks(config: &mut EventConfig, env_vars: &HashMap<String, String>) -> usize {
    let mut applied = 0;
    if config.log.level.is_none()
        && let Some(level) = env_vars.get(LOG_LEVEL_ENV).filter(|v| !v.is_empty())
    {
        config.log.level = Some(level.clone());
        applied = 1;
    }
    applied
}
