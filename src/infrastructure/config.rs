// Configuration - Relay settings loaded from config/relay.toml and RELAY__ variables
use crate::application::tracker::TrackerSettings;
use crate::domain::policy::IntervalTable;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerSettings,
    pub collector: CollectorSettings,
    pub sampling: IntervalTable,
    pub filter: FilterSettings,
    pub delivery: DeliverySettings,
    pub power: PowerSettings,
    pub storage: StorageSettings,
    pub host: HostSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8765".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CollectorSettings {
    /// Used when no collector URL has been stored with the credentials.
    pub default_url: String,
    pub upload_path: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            default_url: "http://127.0.0.1:3000/api".to_string(),
            upload_path: "/location/update".to_string(),
            connect_timeout_secs: 15,
            request_timeout_secs: 15,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FilterSettings {
    pub accuracy_ceiling_meters: f64,
    pub stationary_pause_secs: u64,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            accuracy_ceiling_meters: 25.0,
            stationary_pause_secs: 300,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DeliverySettings {
    pub max_batch_size: usize,
    pub workers: u32,
    pub flush_interval_millis: u64,
    pub shutdown_grace_secs: u64,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            workers: 2,
            flush_interval_millis: 15_000,
            shutdown_grace_secs: 20,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PowerSettings {
    pub low_battery_percent: f32,
}

impl Default for PowerSettings {
    fn default() -> Self {
        Self {
            low_battery_percent: 20.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageSettings {
    pub preferences_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            preferences_path: PathBuf::from("data/preferences.toml"),
        }
    }
}

/// Permission state assumed until the host reports otherwise.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HostSettings {
    pub location_permission: bool,
    pub activity_permission: bool,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            location_permission: true,
            activity_permission: true,
        }
    }
}

impl RelayConfig {
    pub fn tracker_settings(&self) -> TrackerSettings {
        TrackerSettings {
            intervals: self.sampling.clone(),
            accuracy_ceiling_meters: self.filter.accuracy_ceiling_meters,
            stationary_pause_millis: (self.filter.stationary_pause_secs * 1000) as i64,
            low_battery_percent: self.power.low_battery_percent,
            flush_interval: Duration::from_millis(self.delivery.flush_interval_millis),
            shutdown_grace: self.shutdown_grace(),
            default_collector_url: self.collector.default_url.clone(),
        }
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.delivery.shutdown_grace_secs)
    }
}

/// Load `config/relay.toml` (optional) overlaid with `RELAY__SECTION__KEY` variables.
pub fn load_relay_config() -> anyhow::Result<RelayConfig> {
    build_relay_config(config::File::with_name("config/relay").required(false))
}

fn build_relay_config<S>(file: S) -> anyhow::Result<RelayConfig>
where
    S: config::Source + Send + Sync + 'static,
{
    let settings = config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix("RELAY")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
