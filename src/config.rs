use crate::error::SeagrassError;
use crate::projection::UtmZone;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub input: InputConfig,
    pub projection: ProjectionConfig,
    pub grid: GridConfig,
    pub map: MapConfig,
    pub random: RandomDataConfig,
    pub style: StyleConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    // Random data is generated when this is unset or missing on disk
    pub data_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectionConfig {
    /// UTM zone used for the plot geometry, e.g. "EPSG:32631" or "31N".
    pub zone: String,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self { zone: "EPSG:32631".to_string() }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    pub size_meters: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { size_meters: 20.0 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct MapConfig {
    /// Initial view center as `[latitude, longitude]`.
    pub center: [f64; 2],
    pub zoom: u8,
    pub tiles: String,
    pub attribution: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: [51.4501, 4.1901],
            zoom: 15,
            tiles: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            attribution: "&copy; OpenStreetMap contributors".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct RandomDataConfig {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
    pub count: usize,
    pub plants_min: u32,
    pub plants_max: u32,
    pub methods: Vec<u32>,
    pub seed: Option<u64>,
}

impl Default for RandomDataConfig {
    fn default() -> Self {
        // Eastern Scheldt survey area
        Self {
            min_lat: 51.4459,
            max_lat: 51.4521,
            min_lon: 4.1828,
            max_lon: 4.2032,
            count: 100,
            plants_min: 0,
            plants_max: 100,
            methods: vec![1, 2, 3, 4],
            seed: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct StyleConfig {
    /// Upper end of the plant-count scale; larger counts share the top band.
    pub plant_count_max: u32,
    /// Fill colors from lowest to highest band.
    pub fill_palette: Vec<String>,
    /// Border color per method code (TOML keys are the codes).
    pub method_colors: BTreeMap<String, String>,
    pub unknown_method_color: String,
    pub border_weight: f64,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            plant_count_max: 100,
            // ColorBrewer YlGn, six classes
            fill_palette: ["#ffffcc", "#d9f0a3", "#addd8e", "#78c679", "#31a354", "#006837"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            method_colors: [("1", "orange"), ("2", "red"), ("3", "blue"), ("4", "yellow")]
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            unknown_method_color: "gray".to_string(),
            border_weight: 4.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub html: PathBuf,
    pub geojson: Option<PathBuf>,
    pub open_browser: bool,
    /// Program (plus arguments) used instead of the platform opener.
    pub viewer: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            html: PathBuf::from("seagrass_map.html"),
            geojson: None,
            open_browser: true,
            viewer: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Falls back to the built-in survey defaults when `path` does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::info!("Config file {:?} not found, using built-in defaults", path);
            Ok(Self::default())
        }
    }

    pub fn zone(&self) -> Result<UtmZone, SeagrassError> {
        self.projection
            .zone
            .parse()
            .map_err(|e| SeagrassError::Config(format!("projection.zone: {}", e)))
    }

    pub fn validate(&self) -> Result<(), SeagrassError> {
        self.zone()?;

        let grid = self.grid.size_meters;
        if !grid.is_finite() || grid <= 0.0 {
            return Err(SeagrassError::Config(format!(
                "grid.size_meters must be a positive number, got {}",
                grid
            )));
        }

        let [lat, lon] = self.map.center;
        if !lat.is_finite() || !lon.is_finite() || lat.abs() > 90.0 || lon.abs() > 180.0 {
            return Err(SeagrassError::Config(format!(
                "map.center [{}, {}] is not a valid coordinate",
                lat, lon
            )));
        }

        if self.style.fill_palette.is_empty() {
            return Err(SeagrassError::Config("style.fill_palette must not be empty".to_string()));
        }
        if !self.style.border_weight.is_finite() || self.style.border_weight < 0.0 {
            return Err(SeagrassError::Config(format!(
                "style.border_weight must be non-negative, got {}",
                self.style.border_weight
            )));
        }

        // Checks method codes and color distinctness.
        crate::style::Styler::from_config(&self.style)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_scheldt_survey() {
        let config = AppConfig::default();
        assert_eq!(config.zone().unwrap().epsg(), 32631);
        assert_eq!(config.grid.size_meters, 20.0);
        assert_eq!(config.map.center, [51.4501, 4.1901]);
        assert_eq!(config.random.count, 100);
        assert_eq!(config.random.methods, vec![1, 2, 3, 4]);
        assert_eq!(config.style.fill_palette.len(), 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[input]
data_file = "plots.txt"

[grid]
size_meters = 10.0

[style.method_colors]
1 = "purple"
2 = "green"
"#
        )
        .unwrap();

        let config = AppConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.input.data_file, Some(PathBuf::from("plots.txt")));
        assert_eq!(config.grid.size_meters, 10.0);
        assert_eq!(config.map.zoom, 15);
        assert_eq!(config.style.method_colors.len(), 2);
        assert_eq!(config.style.method_colors["1"], "purple");
    }

    #[test]
    fn viewer_override_is_read_from_output_section() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[output]\nviewer = \"firefox --new-window\"").unwrap();
        let config = AppConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.output.viewer.as_deref(), Some("firefox --new-window"));
        assert!(config.output.open_browser);
        assert!(AppConfig::default().output.viewer.is_none());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[grid]\nsize = 10.0").unwrap();
        assert!(AppConfig::load_from_file(file.path()).is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.output.html, PathBuf::from("seagrass_map.html"));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.grid.size_meters = 0.0;
        assert!(matches!(config.validate(), Err(SeagrassError::Config(_))));

        let mut config = AppConfig::default();
        config.projection.zone = "EPSG:4326".to_string();
        assert!(matches!(config.validate(), Err(SeagrassError::Config(_))));

        let mut config = AppConfig::default();
        config.map.center = [95.0, 4.0];
        assert!(matches!(config.validate(), Err(SeagrassError::Config(_))));

        let mut config = AppConfig::default();
        config.style.method_colors.insert("5".to_string(), "Orange".to_string());
        assert!(matches!(config.validate(), Err(SeagrassError::Config(_))));
    }
}
