//! Pipeline configuration.

use std::path::{Path, PathBuf};

use alerta_types::Crs;
use serde::{Deserialize, Serialize};

use crate::engine::{GeoEngineOptions, Source};
use crate::error::{AlertaError, Result};
use crate::io::ContainerFormat;
use crate::stage::LikePattern;

/// Settings of one pipeline run.
///
/// Every field has a default, so a JSON configuration file only needs to name the inputs and the results
/// directory:
///
/// ```json
/// { "car_source": "data/car.geojson", "alerts_source": "data/alerts.geojson", "results_dir": "results" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Cadastre of rural properties.
    pub car_source: PathBuf,
    /// Deforestation alert footprints.
    pub alerts_source: PathBuf,
    /// Directory the result file is written into.
    pub results_dir: PathBuf,
    /// Stem of the result file name.
    pub output_name: String,
    /// Container of the result file.
    pub output_format: ContainerFormat,
    /// Name of the result layer. Defaults to `output_name`.
    pub layer_name: Option<String>,
    /// Attribute holding the property status.
    pub status_field: String,
    /// Substring the status must contain.
    pub status_pattern: String,
    /// Whether the status match ignores letter case.
    pub case_insensitive: bool,
    /// Attribute identifying the property.
    pub key_field: String,
    /// EPSG code assigned to both inputs instead of the one they declare.
    pub source_crs: Option<u32>,
    /// EPSG code of the metric system the area is computed in.
    pub target_crs: u32,
    /// Number of chunks the dissolve is split into. `1` dissolves in one pass.
    pub partitions: usize,
    /// Grid size used to snap coordinates when repairing invalid geometry, in units of the input system.
    pub snap_grid: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            car_source: PathBuf::new(),
            alerts_source: PathBuf::new(),
            results_dir: PathBuf::new(),
            output_name: "results_alerta".to_string(),
            output_format: ContainerFormat::GeoJson,
            layer_name: None,
            status_field: "des_condic".to_string(),
            status_pattern: "analise".to_string(),
            case_insensitive: true,
            key_field: "cod_imovel".to_string(),
            source_crs: None,
            target_crs: Crs::SIRGAS2000_UTM_22S.code(),
            partitions: 1,
            snap_grid: GeoEngineOptions::default().snap_grid,
        }
    }
}

impl PipelineConfig {
    /// Configuration with default settings for the given inputs and results directory.
    pub fn new(
        car_source: impl Into<PathBuf>,
        alerts_source: impl Into<PathBuf>,
        results_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            car_source: car_source.into(),
            alerts_source: alerts_source.into(),
            results_dir: results_dir.into(),
            ..Default::default()
        }
    }

    /// Loads the configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&text).map_err(|err| {
            AlertaError::Config(format!("{}: {err}", path.as_ref().display()))
        })
    }

    /// Sets the stem of the result file name.
    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = name.into();
        self
    }

    /// Sets the container of the result file.
    pub fn with_output_format(mut self, format: ContainerFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Sets the name of the result layer.
    pub fn with_layer_name(mut self, name: impl Into<String>) -> Self {
        self.layer_name = Some(name.into());
        self
    }

    /// Sets the status attribute and the substring it must contain.
    pub fn with_status_filter(
        mut self,
        field: impl Into<String>,
        pattern: impl Into<String>,
        case_insensitive: bool,
    ) -> Self {
        self.status_field = field.into();
        self.status_pattern = pattern.into();
        self.case_insensitive = case_insensitive;
        self
    }

    /// Sets the property identifier attribute.
    pub fn with_key_field(mut self, field: impl Into<String>) -> Self {
        self.key_field = field.into();
        self
    }

    /// Assigns the coordinate system of the inputs.
    pub fn with_source_crs(mut self, code: u32) -> Self {
        self.source_crs = Some(code);
        self
    }

    /// Sets the coordinate system of the result.
    pub fn with_target_crs(mut self, code: u32) -> Self {
        self.target_crs = code;
        self
    }

    /// Sets the number of dissolve partitions.
    pub fn with_partitions(mut self, partitions: usize) -> Self {
        self.partitions = partitions;
        self
    }

    /// Sets the repair snapping grid.
    pub fn with_snap_grid(mut self, snap_grid: f64) -> Self {
        self.snap_grid = snap_grid;
        self
    }

    /// Checks that the inputs and the results directory exist and that the settings are consistent.
    pub fn validate(&self) -> Result<()> {
        for (name, path) in [
            ("CAR", &self.car_source),
            ("alerts", &self.alerts_source),
        ] {
            if !path.is_file() {
                return Err(AlertaError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{name} file not found: {}", path.display()),
                )));
            }
        }

        if !self.results_dir.is_dir() {
            return Err(AlertaError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("results directory not found: {}", self.results_dir.display()),
            )));
        }

        if !self.output_format.is_writable() {
            return Err(AlertaError::Config(format!(
                "results cannot be written as .{}",
                self.output_format.extension()
            )));
        }

        if self.output_name.is_empty() {
            return Err(AlertaError::Config("output name is empty".into()));
        }

        if self.key_field.is_empty() || self.status_field.is_empty() {
            return Err(AlertaError::Config(
                "key and status fields must be named".into(),
            ));
        }

        if self.partitions == 0 {
            return Err(AlertaError::Config(
                "partition count must be at least 1".into(),
            ));
        }

        if !self.snap_grid.is_finite() || self.snap_grid < 0.0 {
            return Err(AlertaError::Config(format!(
                "snap grid must be a non-negative number, got {}",
                self.snap_grid
            )));
        }

        Ok(())
    }

    /// Full path of the result file.
    pub fn destination(&self) -> PathBuf {
        self.results_dir.join(format!(
            "{}.{}",
            self.output_name,
            self.output_format.extension()
        ))
    }

    /// Name of the result layer.
    pub fn layer_name(&self) -> &str {
        self.layer_name.as_deref().unwrap_or(&self.output_name)
    }

    /// Status predicate.
    pub fn status_pattern(&self) -> LikePattern {
        LikePattern::new(self.status_pattern.clone(), self.case_insensitive)
    }

    /// Coordinate system assigned to the inputs, if any.
    pub fn source_crs(&self) -> Result<Option<Crs>> {
        Ok(self.source_crs.map(Crs::from_epsg).transpose()?)
    }

    /// Coordinate system of the result.
    pub fn target_crs(&self) -> Result<Crs> {
        Ok(Crs::from_epsg(self.target_crs)?)
    }

    /// Cadastre source with the key and status columns.
    pub fn car(&self) -> Result<Source> {
        Ok(Source::new(&self.car_source)
            .with_columns([self.key_field.clone(), self.status_field.clone()])
            .with_crs(self.source_crs()?))
    }

    /// Alerts source. Alert attributes are not used by the pipeline.
    pub fn alerts(&self) -> Result<Source> {
        Ok(Source::new(&self.alerts_source).with_crs(self.source_crs()?))
    }

    /// Options of the geometry engine.
    pub fn engine_options(&self) -> GeoEngineOptions {
        GeoEngineOptions {
            snap_grid: self.snap_grid,
            ..Default::default()
        }
    }
}
