use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub normalize: NormalizeConfig,
    #[serde(default)]
    pub queue: QueueConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InventoryConfig {
    #[serde(default = "default_inventory_url")]
    pub url: String,
    #[serde(default = "default_selection_url")]
    pub selection_url: String,
    /// Fetch permits shared by the whole batch.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            url: default_inventory_url(),
            selection_url: default_selection_url(),
            concurrency: default_concurrency(),
            timeout_secs: None,
        }
    }
}

fn default_inventory_url() -> String {
    "https://inventory.apps.satcloud.space".to_string()
}
fn default_selection_url() -> String {
    "https://inventory-selection.apps.satcloud.space".to_string()
}
fn default_concurrency() -> usize {
    5
}

/// Filter body sent to the bulk selection endpoint.
#[derive(Debug, Deserialize, Clone)]
pub struct SelectionConfig {
    #[serde(default = "default_start_time")]
    pub start_time: String,
    #[serde(default = "default_end_time")]
    pub end_time: String,
    #[serde(default = "default_true")]
    pub is_geospatial: bool,
    #[serde(default)]
    pub is_off_earth: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            start_time: default_start_time(),
            end_time: default_end_time(),
            is_geospatial: true,
            is_off_earth: false,
        }
    }
}

fn default_start_time() -> String {
    "2016-01-01T00:00:00Z".to_string()
}
fn default_end_time() -> String {
    "2020-01-01T00:00:00Z".to_string()
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default)]
    pub token_server: Option<String>,
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_server: None,
            max_age_secs: default_max_age_secs(),
        }
    }
}

fn default_max_age_secs() -> u64 {
    600
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_url")]
    pub url: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: default_catalog_url(),
        }
    }
}

fn default_catalog_url() -> String {
    "https://api.discover.digitalglobe.com/v2/stac".to_string()
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EpsgMode {
    #[default]
    Parse,
    Null,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StereoMode {
    #[default]
    Empty,
    Fetch,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NormalizeConfig {
    #[serde(default)]
    pub epsg: EpsgMode,
    #[serde(default)]
    pub stereo: StereoMode,
    #[serde(default)]
    pub vehicles: Vec<VehicleConfig>,
}

/// Extra vehicle profile registered on top of the built-in ones.
#[derive(Debug, Deserialize, Clone)]
pub struct VehicleConfig {
    pub vehicle_name: String,
    pub platform: String,
    #[serde(default = "default_constellation")]
    pub constellation: String,
    #[serde(default = "default_instrument")]
    pub instrument: String,
    #[serde(default)]
    pub bands: Vec<BandConfig>,
    #[serde(default = "default_true")]
    pub requires_pan: bool,
    #[serde(default = "default_true")]
    pub requires_multi: bool,
}

fn default_constellation() -> String {
    "WORLDVIEW".to_string()
}
fn default_instrument() -> String {
    "VNIR".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct BandConfig {
    pub name: String,
    pub center_wavelength: f64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct QueueConfig {
    #[serde(default)]
    pub region: Option<String>,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load the file when a path is given, otherwise fall back to defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => load_config(p),
        None => Ok(Config::default()),
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.inventory.concurrency == 0 {
        anyhow::bail!("inventory.concurrency must be >= 1");
    }

    if config.auth.max_age_secs == 0 {
        anyhow::bail!("auth.max_age_secs must be > 0");
    }

    let mut seen = HashSet::new();
    for vehicle in &config.normalize.vehicles {
        if !vehicle.requires_pan && !vehicle.requires_multi {
            anyhow::bail!(
                "normalize.vehicles '{}' must require at least one band-set summary",
                vehicle.vehicle_name
            );
        }
        if !seen.insert(vehicle.vehicle_name.as_str()) {
            anyhow::bail!(
                "normalize.vehicles '{}' is defined more than once",
                vehicle.vehicle_name
            );
        }
    }

    Ok(())
}
