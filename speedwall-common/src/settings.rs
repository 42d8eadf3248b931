//! Server settings and data directory resolution
//!
//! Resolution priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. OS-dependent compiled default (fallback)

use std::path::PathBuf;
use std::time::Duration;

/// Environment variable naming the data directory
pub const DATA_DIR_ENV: &str = "SPEEDWALL_DATA";

/// Default HTTP listen port
pub const DEFAULT_PORT: u16 = 4920;

/// Default time one infraction stays on the wall before rotation advances
pub const DEFAULT_DISPLAY_DURATION: Duration = Duration::from_millis(8000);

/// Default minimum interval between telemetry samples forwarded to a viewer
pub const DEFAULT_TELEMETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Number of recent infractions a wall viewer rotates through
pub const ROTATION_CAPACITY: usize = 50;

/// Per-topic event bus buffer; sized for sensor-rate telemetry bursts
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Resolve the data directory holding the database and stored assets
pub fn resolve_data_dir(cli_arg: Option<&str>) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    get_default_data_dir()
}

/// Get OS-dependent default data directory path
fn get_default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("speedwall"))
        .unwrap_or_else(|| PathBuf::from("./speedwall_data"))
}

/// Database file location inside the data directory
pub fn db_path(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("speedwall.db")
}

/// Asset object location inside the data directory
pub fn asset_dir(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("assets")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_argument_wins_over_everything() {
        let dir = resolve_data_dir(Some("/tmp/speedwall-cli"));
        assert_eq!(dir, PathBuf::from("/tmp/speedwall-cli"));
    }

    #[test]
    fn derived_paths_live_under_the_data_dir() {
        let data_dir = PathBuf::from("/srv/speedwall");
        assert_eq!(db_path(&data_dir), PathBuf::from("/srv/speedwall/speedwall.db"));
        assert_eq!(asset_dir(&data_dir), PathBuf::from("/srv/speedwall/assets"));
    }
}
