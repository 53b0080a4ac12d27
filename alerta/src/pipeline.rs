//! Orchestration of a full run.

use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

use geo_types::MultiPolygon;
use web_time::Instant;

use crate::config::PipelineConfig;
use crate::engine::{GeoEngine, GeometryEngine};
use crate::error::{AlertaError, PipelineFailure};
use crate::feature::FeatureCollection;
use crate::stage::{
    AreaCalculator, CrsReprojector, DissolveAggregator, OverlayIntersector, ResultWriter, StatusFilter,
};

/// Steps of the pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Acquiring the engine and reading both inputs.
    Load,
    /// Status filter of the cadastre.
    Filter,
    /// Overlay with the alerts.
    Intersect,
    /// Union of the fragments of each property.
    Dissolve,
    /// Transformation into the metric system.
    Reproject,
    /// Area computation.
    ComputeArea,
    /// Writing the result file.
    Write,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::Filter => "filter",
            Stage::Intersect => "intersect",
            Stage::Dissolve => "dissolve",
            Stage::Reproject => "reproject",
            Stage::ComputeArea => "compute area",
            Stage::Write => "write",
        };

        f.write_str(name)
    }
}

/// State of a [`Pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Not run yet.
    Ready,
    /// Inputs are loaded.
    Loaded,
    /// Cadastre is filtered.
    Filtered,
    /// Overlay fragments are computed.
    Intersected,
    /// Fragments are merged per property.
    Dissolved,
    /// Geometries are in the target system.
    Reprojected,
    /// Areas are computed.
    AreaComputed,
    /// Result file is written.
    Written,
    /// Run completed.
    Done,
    /// Run aborted in the given stage.
    Failed(Stage),
}

/// Number of features after each stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageCounts {
    /// Features read from the cadastre.
    pub cadastre: usize,
    /// Alert footprints read.
    pub alerts: usize,
    /// Cadastre features that passed the status filter.
    pub filtered: usize,
    /// Overlay fragments.
    pub fragments: usize,
    /// Properties with alert area, one feature each.
    pub properties: usize,
}

/// Summary of a successful run.
#[derive(Debug, Clone)]
pub struct PipelineResult<G = MultiPolygon<f64>> {
    /// Written features: key, area in hectares and geometry in the target system.
    pub features: FeatureCollection<G>,
    /// Wall time of the run.
    pub elapsed: Duration,
    /// Path of the written file.
    pub destination: PathBuf,
    /// Feature counts along the way.
    pub counts: StageCounts,
}

/// Runs the alert pipeline: load, filter, intersect, dissolve, reproject, compute area, write.
///
/// The stages run one after another. A failing stage aborts the run and nothing is written. The geometry engine
/// lives exactly as long as one run.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    state: PipelineState,
}

impl Pipeline {
    /// Creates a pipeline for the configuration.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            state: PipelineState::Ready,
        }
    }

    /// Configuration of the pipeline.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Current state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Runs the pipeline with a [`GeoEngine`].
    pub fn run(&mut self) -> Result<PipelineResult, PipelineFailure> {
        let options = self.config.engine_options();
        self.run_with(|| GeoEngine::open(options))
    }

    /// Runs the pipeline with the engine returned by `open_engine`. The engine is dropped before this method
    /// returns, on success and on failure.
    pub fn run_with<E, F>(
        &mut self,
        open_engine: F,
    ) -> Result<PipelineResult<E::Geometry>, PipelineFailure>
    where
        E: GeometryEngine + Sync,
        F: FnOnce() -> crate::error::Result<E>,
    {
        let started = Instant::now();
        self.state = PipelineState::Ready;

        let result = self.execute(open_engine, started);
        match &result {
            Ok(result) => {
                self.state = PipelineState::Done;
                log::info!("Finished in {}", format_elapsed(result.elapsed));
            }
            Err(failure) => {
                self.state = PipelineState::Failed(failure.stage);
                log::error!("{failure}");
            }
        }

        result
    }

    fn advance(&mut self, state: PipelineState) {
        log::debug!("Pipeline state: {:?} -> {state:?}", self.state);
        self.state = state;
    }

    fn execute<E, F>(
        &mut self,
        open_engine: F,
        started: Instant,
    ) -> Result<PipelineResult<E::Geometry>, PipelineFailure>
    where
        E: GeometryEngine + Sync,
        F: FnOnce() -> crate::error::Result<E>,
    {
        let config = self.config.clone();
        let failed = |stage: Stage| move |source: AlertaError| PipelineFailure { stage, source };
        let mut counts = StageCounts::default();

        log::info!("Loading layers...");
        let engine = open_engine().map_err(failed(Stage::Load))?;
        log::debug!("Using {} geometry engine", engine.name());

        let car = config
            .car()
            .and_then(|source| engine.read(&source))
            .map_err(failed(Stage::Load))?;
        let alerts = config
            .alerts()
            .and_then(|source| engine.read(&source))
            .map_err(failed(Stage::Load))?;
        counts.cadastre = car.len();
        counts.alerts = alerts.len();
        log::info!(
            "Loaded {} cadastre features and {} alerts",
            counts.cadastre,
            counts.alerts
        );
        self.advance(PipelineState::Loaded);

        log::info!("Filtering...");
        let filtered = StatusFilter::new(&config.status_field, config.status_pattern())
            .filter(&engine, car)
            .map_err(failed(Stage::Filter))?;
        counts.filtered = filtered.len();
        log::info!(
            "{} features match `{}`",
            counts.filtered,
            config.status_pattern
        );
        self.advance(PipelineState::Filtered);

        log::info!("Intersection layers...");
        let fragments = OverlayIntersector::new(&config.key_field)
            .intersect(&engine, filtered, alerts)
            .map_err(failed(Stage::Intersect))?;
        counts.fragments = fragments.len();
        self.advance(PipelineState::Intersected);

        log::info!("Dissolving...");
        let dissolved = DissolveAggregator::new(&config.key_field)
            .dissolve_partitioned(&engine, fragments, config.partitions)
            .map_err(failed(Stage::Dissolve))?;
        counts.properties = dissolved.len();
        self.advance(PipelineState::Dissolved);

        log::info!("Transforming...");
        let projected = config
            .target_crs()
            .and_then(|target| CrsReprojector::new(target).reproject(&engine, dissolved))
            .map_err(failed(Stage::Reproject))?;
        self.advance(PipelineState::Reprojected);

        log::info!("Calculating area...");
        let measured = AreaCalculator
            .compute_area_ha(&engine, projected)
            .map_err(failed(Stage::ComputeArea))?;
        self.advance(PipelineState::AreaComputed);

        log::info!("Saving results...");
        let destination = config.destination();
        ResultWriter::new(&config.key_field, config.layer_name())
            .write(&engine, &measured, &destination)
            .map_err(failed(Stage::Write))?;
        self.advance(PipelineState::Written);

        log::info!(
            "{} properties with alerts written to {}",
            counts.properties,
            destination.display()
        );

        Ok(PipelineResult {
            features: measured,
            elapsed: started.elapsed(),
            destination,
            counts,
        })
    }
}

/// Formats the duration as `HH:MM:SS.mmm`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    let hours = millis / 3_600_000;
    let minutes = millis / 60_000 % 60;
    let seconds = millis / 1_000 % 60;
    let millis = millis % 1_000;

    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::io::tests::temp_dir;
    use assert_matches::assert_matches;

    #[test]
    fn elapsed_format() {
        assert_eq!(format_elapsed(Duration::from_millis(0)), "00:00:00.000");
        assert_eq!(
            format_elapsed(Duration::from_millis(3_723_045)),
            "01:02:03.045"
        );
        assert_eq!(
            format_elapsed(Duration::from_secs(100 * 3600)),
            "100:00:00.000"
        );
    }

    #[test]
    fn stage_names() {
        let failure = PipelineFailure {
            stage: Stage::ComputeArea,
            source: AlertaError::Precondition("geographic".into()),
        };
        assert_eq!(
            failure.to_string(),
            "compute area stage failed: precondition failed: geographic"
        );
    }

    #[test]
    fn missing_input_fails_in_load() {
        let dir = temp_dir("pipeline-missing");
        let config = PipelineConfig::new(dir.join("car.geojson"), dir.join("alerts.geojson"), &dir);
        let mut pipeline = Pipeline::new(config);

        let failure = pipeline.run().unwrap_err();
        assert_eq!(failure.stage, Stage::Load);
        assert_eq!(failure.source.kind(), ErrorKind::Io);
        assert_eq!(pipeline.state(), PipelineState::Failed(Stage::Load));
    }

    #[test]
    fn engine_failure_fails_in_load() {
        let dir = temp_dir("pipeline-engine");
        let mut pipeline = Pipeline::new(PipelineConfig::new("a", "b", &dir).with_snap_grid(-1.0));

        assert_matches!(
            pipeline.run(),
            Err(PipelineFailure {
                stage: Stage::Load,
                source: AlertaError::Config(_)
            })
        );
    }
}
