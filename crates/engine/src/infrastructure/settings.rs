//! Process-level settings read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use crate::use_cases::timeout::SUPERVISOR_INTERVAL;

/// Paths and loop intervals for the engine binary.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub config_path: PathBuf,
    pub despawn_store_path: PathBuf,
    pub supervisor_interval: Duration,
    pub reconcile_interval: Duration,
    /// Delay before despawn records are processed on startup.
    pub startup_grace: Duration,
    /// Process-wide switch; the config file's flag must also be on.
    pub natural_spawns: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("comet_config.json"),
            despawn_store_path: PathBuf::from("comet_despawns.json"),
            supervisor_interval: SUPERVISOR_INTERVAL,
            reconcile_interval: Duration::from_secs(300),
            startup_grace: Duration::from_secs(2),
            natural_spawns: true,
        }
    }
}

impl EngineSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparseable values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let secs = |key: &str, fallback: Duration| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(fallback)
        };

        Self {
            config_path: lookup("COMET_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.config_path),
            despawn_store_path: lookup("COMET_DESPAWN_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.despawn_store_path),
            supervisor_interval: secs(
                "COMET_SUPERVISOR_INTERVAL_SECS",
                defaults.supervisor_interval,
            ),
            reconcile_interval: secs("COMET_RECONCILE_INTERVAL_SECS", defaults.reconcile_interval),
            startup_grace: lookup("COMET_STARTUP_GRACE_SECS")
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.startup_grace),
            natural_spawns: lookup("COMET_NATURAL_SPAWNS")
                .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "off" | "no"))
                .unwrap_or(defaults.natural_spawns),
        }
    }
}
