// Daemon configuration - TOML key/value file with defaulting write-back
// The daemon always ends up with a complete, typed configuration, no
// matter what state the file on disk is in.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use toml::{Table, Value};
use tracing::warn;

/// Config file location when `-c/--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/macrokeyd.conf";

/// Pid file location when the config does not name one.
pub const DEFAULT_PID_FILE: &str = "/var/run/macrokeyd.pid";

/// Daemon settings.
///
/// All four fields are guaranteed present and correctly typed after
/// [`Config::load`]; keys the daemon does not recognize are carried
/// through the write-back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Account the daemon de-escalates to after acquiring its lock.
    pub user: String,
    /// Initial profile number the listener starts on.
    pub profile: i64,
    /// Whether macro recording captures inter-key delays.
    pub capture_delays: bool,
    /// Lock file enforcing the single-instance guarantee.
    #[serde(rename = "pid-file")]
    pub pid_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user: "root".to_string(),
            profile: 1,
            capture_delays: true,
            pid_file: PathBuf::from(DEFAULT_PID_FILE),
        }
    }
}

impl Config {
    /// Load the config file at `path`, filling in defaults for missing or
    /// mistyped keys, and write the merged result back.
    ///
    /// Nothing here is fatal: an unreadable or malformed file falls back
    /// to an empty base, and a failed write-back is only logged. The
    /// returned config is complete either way.
    pub fn load(path: &Path) -> Config {
        let mut table = read_table(path);
        let config = Self::apply_defaults(&mut table);

        if let Err(err) = fs::write(path, table.to_string()) {
            warn!(
                path = %path.display(),
                error = %err,
                "could not write merged config back"
            );
        }

        config
    }

    /// Fill `table` in place with defaults for every recognized key that
    /// is absent or has the wrong type, and extract the typed config.
    fn apply_defaults(table: &mut Table) -> Config {
        let defaults = Config::default();

        let user = coerce_str(table, "user", &defaults.user);
        let profile = coerce_int(table, "profile", defaults.profile);
        let capture_delays = coerce_bool(table, "capture_delays", defaults.capture_delays);
        let pid_file = coerce_str(table, "pid-file", &defaults.pid_file.to_string_lossy());

        Config {
            user,
            profile,
            capture_delays,
            pid_file: PathBuf::from(pid_file),
        }
    }
}

fn read_table(path: &Path) -> Table {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "config file not readable, starting from defaults"
            );
            return Table::new();
        }
    };

    match text.parse::<Table>() {
        Ok(table) => table,
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "config file is not valid TOML, starting from defaults"
            );
            Table::new()
        }
    }
}

// A key holding a value of the wrong type counts as absent and is
// overwritten with the default rather than rejected.

fn coerce_str(table: &mut Table, key: &str, default: &str) -> String {
    match table.get(key).and_then(Value::as_str) {
        Some(value) => value.to_string(),
        None => {
            report_mistyped(table, key, "string");
            table.insert(key.to_string(), Value::String(default.to_string()));
            default.to_string()
        }
    }
}

fn coerce_int(table: &mut Table, key: &str, default: i64) -> i64 {
    match table.get(key).and_then(Value::as_integer) {
        Some(value) => value,
        None => {
            report_mistyped(table, key, "integer");
            table.insert(key.to_string(), Value::Integer(default));
            default
        }
    }
}

fn coerce_bool(table: &mut Table, key: &str, default: bool) -> bool {
    match table.get(key).and_then(Value::as_bool) {
        Some(value) => value,
        None => {
            report_mistyped(table, key, "boolean");
            table.insert(key.to_string(), Value::Boolean(default));
            default
        }
    }
}

fn report_mistyped(table: &Table, key: &str, expected: &str) {
    if table.contains_key(key) {
        warn!(key, expected, "config key has the wrong type, using default");
    }
}
