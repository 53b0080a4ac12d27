use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use alerta::alerta_types::geo::Projection;
use alerta::alerta_types::Crs;
use alerta::engine::{GeoEngine, GeoEngineOptions, GeometryEngine, Source};
use alerta::io::ContainerFormat;
use alerta::stage::AREA_FIELD;
use alerta::{AlertaError, ErrorKind, Pipeline, PipelineConfig, PipelineState, Stage};
use approx::assert_relative_eq;
use assert_matches::assert_matches;
use geo::Area;
use geo_types::{polygon, Coord, MultiPolygon};

const CAR: &str = r#"{
    "type": "FeatureCollection",
    "crs": { "type": "name", "properties": { "name": "EPSG:4674" } },
    "features": [
        {
            "type": "Feature",
            "properties": { "cod_imovel": "P1", "des_condic": "Em análise" },
            "geometry": {
                "type": "MultiPolygon",
                "coordinates": [
                    [[[-51.02, -10.02], [-51.01, -10.02], [-51.01, -10.01], [-51.02, -10.01], [-51.02, -10.02]]],
                    [[[-50.99, -10.02], [-50.98, -10.02], [-50.98, -10.01], [-50.99, -10.01], [-50.99, -10.02]]]
                ]
            }
        },
        {
            "type": "Feature",
            "properties": { "cod_imovel": "P2", "des_condic": "Aprovado" },
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[-51.0, -10.02], [-50.995, -10.02], [-50.995, -10.01], [-51.0, -10.01], [-51.0, -10.02]]]
            }
        }
    ]
}"#;

const ALERTS: &str = r#"{
    "type": "FeatureCollection",
    "crs": { "type": "name", "properties": { "name": "EPSG:4674" } },
    "features": [
        {
            "type": "Feature",
            "properties": { "cod_alerta": 77 },
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[-51.015, -10.015], [-51.005, -10.015], [-51.005, -10.005], [-51.015, -10.005], [-51.015, -10.015]]]
            }
        }
    ]
}"#;

fn temp_dir(name: &str) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    let dir = std::env::temp_dir().join(format!(
        "alerta-it-{name}-{}-{}",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn inputs(dir: &Path) -> (PathBuf, PathBuf) {
    let car = dir.join("car.geojson");
    let alerts = dir.join("alerts.geojson");
    std::fs::write(&car, CAR).unwrap();
    std::fs::write(&alerts, ALERTS).unwrap();
    (car, alerts)
}

fn config(name: &str) -> PipelineConfig {
    let dir = temp_dir(name);
    let (car, alerts) = inputs(&dir);
    PipelineConfig::new(car, alerts, &dir).with_status_filter("des_condic", "análise", true)
}

/// Area in hectares of the overlap between P1's first parcel and the alert, measured independently of the
/// pipeline.
fn expected_hectares() -> f64 {
    let projection = Crs::SIRGAS2000
        .transformation_to(&Crs::SIRGAS2000_UTM_22S)
        .unwrap();
    let overlap = polygon![
        (x: -51.015, y: -10.015),
        (x: -51.01, y: -10.015),
        (x: -51.01, y: -10.01),
        (x: -51.015, y: -10.01),
        (x: -51.015, y: -10.015),
    ];
    let projected = overlap
        .exterior()
        .0
        .iter()
        .map(|c| projection.project(c).unwrap())
        .collect::<Vec<Coord<f64>>>();

    geo_types::Polygon::new(projected.into(), vec![]).unsigned_area() / 10_000.0
}

fn read_back(path: &Path) -> alerta::FeatureCollection<MultiPolygon<f64>> {
    let engine = GeoEngine::open(GeoEngineOptions::default()).unwrap();
    engine.read(&Source::new(path)).unwrap()
}

#[test]
fn only_the_property_under_analysis_is_reported() {
    let config = config("scenario");
    let destination = config.destination();
    let mut pipeline = Pipeline::new(config);

    let result = pipeline.run().unwrap();
    assert_eq!(pipeline.state(), PipelineState::Done);
    assert_eq!(result.destination, destination);
    assert_eq!(result.counts.cadastre, 2);
    assert_eq!(result.counts.filtered, 1);
    assert_eq!(result.counts.fragments, 1);
    assert_eq!(result.counts.properties, 1);

    let written = read_back(&destination);
    assert_eq!(written.crs(), &Crs::SIRGAS2000_UTM_22S);
    assert_eq!(written.len(), 1);

    let feature = &written.features()[0];
    assert_eq!(feature.join_key("cod_imovel").unwrap().as_str(), "P1");

    let area = feature.get(AREA_FIELD).and_then(|v| v.as_f64()).unwrap();
    let expected = expected_hectares();
    assert_relative_eq!(area, expected, max_relative = 1e-6);
    // roughly 550 m by 550 m
    assert!(area > 25.0 && area < 35.0, "area: {area}");
}

#[test]
fn empty_filter_result_writes_empty_table() {
    let config = config("empty").with_status_filter("des_condic", "cancelado", true);
    let destination = config.destination();

    let result = Pipeline::new(config).run().unwrap();
    assert!(result.features.is_empty());

    let written = read_back(&destination);
    assert!(written.is_empty());
    assert_eq!(written.crs(), &Crs::SIRGAS2000_UTM_22S);
}

#[test]
fn cadastre_without_features_writes_empty_table() {
    let config = config("empty-cadastre");
    std::fs::write(
        &config.car_source,
        r#"{"type": "FeatureCollection", "features": []}"#,
    )
    .unwrap();
    let destination = config.destination();

    let result = Pipeline::new(config).run().unwrap();
    assert_eq!(result.counts.cadastre, 0);
    assert_eq!(result.counts.filtered, 0);
    assert!(result.features.is_empty());

    let written = read_back(&destination);
    assert!(written.is_empty());
    assert_eq!(written.crs(), &Crs::SIRGAS2000_UTM_22S);
}

#[test]
fn cadastre_without_crs_member_is_aligned_with_alerts() {
    let config = config("mixed-crs");
    let undeclared = CAR.replace(
        r#""crs": { "type": "name", "properties": { "name": "EPSG:4674" } },"#,
        "",
    );
    assert!(!undeclared.contains("\"crs\""));
    std::fs::write(&config.car_source, undeclared).unwrap();
    let destination = config.destination();

    let result = Pipeline::new(config).run().unwrap();
    assert_eq!(result.counts.properties, 1);

    let written = read_back(&destination);
    let area = written.features()[0]
        .get(AREA_FIELD)
        .and_then(|v| v.as_f64())
        .unwrap();
    assert_relative_eq!(area, expected_hectares(), max_relative = 1e-6);
}

fn write_car_shapefile(dir: &Path) -> PathBuf {
    use shapefile::dbase::{FieldValue, Record, TableWriterBuilder};
    use shapefile::{Point, Polygon, PolygonRing, Writer};

    let ring = |x0: f64, y0: f64, x1: f64, y1: f64| {
        // clockwise
        PolygonRing::Outer(vec![
            Point::new(x0, y0),
            Point::new(x0, y1),
            Point::new(x1, y1),
            Point::new(x1, y0),
            Point::new(x0, y0),
        ])
    };
    let record = |cod_imovel: &str, des_condic: &str| {
        let mut record = Record::default();
        record.insert(
            "cod_imovel".to_string(),
            FieldValue::Character(Some(cod_imovel.to_string())),
        );
        record.insert(
            "des_condic".to_string(),
            FieldValue::Character(Some(des_condic.to_string())),
        );
        record
    };

    let path = dir.join("car.shp");
    let table = TableWriterBuilder::new()
        .add_character_field("cod_imovel".try_into().unwrap(), 50)
        .add_character_field("des_condic".try_into().unwrap(), 50);
    let mut writer = Writer::from_path(&path, table).unwrap();
    writer
        .write_shape_and_record(
            &Polygon::with_rings(vec![
                ring(-51.02, -10.02, -51.01, -10.01),
                ring(-50.99, -10.02, -50.98, -10.01),
            ]),
            &record("P1", "Em analise"),
        )
        .unwrap();
    writer
        .write_shape_and_record(
            &Polygon::new(ring(-51.0, -10.02, -50.995, -10.01)),
            &record("P2", "Aprovado"),
        )
        .unwrap();
    drop(writer);

    std::fs::write(
        path.with_extension("prj"),
        r#"GEOGCS["GCS_SIRGAS_2000",DATUM["D_SIRGAS_2000",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#,
    )
    .unwrap();

    path
}

#[test]
fn shapefile_cadastre() {
    let mut config = config("shapefile").with_status_filter("des_condic", "analise", true);
    config.car_source = write_car_shapefile(&config.results_dir);
    let destination = config.destination();

    let result = Pipeline::new(config).run().unwrap();
    assert_eq!(result.counts.cadastre, 2);
    assert_eq!(result.counts.filtered, 1);
    assert_eq!(result.counts.properties, 1);

    let written = read_back(&destination);
    let feature = &written.features()[0];
    assert_eq!(feature.join_key("cod_imovel").unwrap().as_str(), "P1");
    let area = feature.get(AREA_FIELD).and_then(|v| v.as_f64()).unwrap();
    assert_relative_eq!(area, expected_hectares(), max_relative = 1e-6);
}

#[test]
fn partitioned_csv_run() {
    let config = config("csv")
        .with_output_format(ContainerFormat::Csv)
        .with_partitions(3);
    let destination = config.destination();
    assert_eq!(destination.extension().unwrap(), "csv");

    Pipeline::new(config).run().unwrap();

    let content = std::fs::read_to_string(&destination).unwrap();
    let mut lines = content.lines();
    assert_eq!(lines.next(), Some("cod_imovel,area_ha,geometry"));
    let row = lines.next().unwrap();
    assert!(row.starts_with("P1,"));
    assert!(row.contains("MULTIPOLYGON"));
    assert_eq!(lines.next(), None);
}

#[test]
fn case_sensitive_pattern_misses_capitalised_status() {
    let config = config("case").with_status_filter("des_condic", "Análise", false);
    let result = Pipeline::new(config).run().unwrap();
    assert_eq!(result.counts.filtered, 0);
}

#[test]
fn failure_names_the_stage_and_writes_nothing() {
    let config = config("failure").with_status_filter("situacao", "análise", true);
    let destination = config.destination();
    let mut pipeline = Pipeline::new(config);

    let failure = pipeline.run().unwrap_err();
    assert_eq!(failure.stage, Stage::Filter);
    assert_eq!(failure.source.kind(), ErrorKind::Schema);
    assert_eq!(pipeline.state(), PipelineState::Failed(Stage::Filter));
    assert!(!destination.exists());
}

#[test]
fn unknown_target_crs_fails_in_reproject() {
    let config = config("target").with_target_crs(2154);
    let failure = Pipeline::new(config).run().unwrap_err();
    assert_eq!(failure.stage, Stage::Reproject);
    assert_matches!(failure.source, AlertaError::Crs(_));
}

#[test]
fn geographic_target_fails_in_area() {
    let config = config("geographic").with_target_crs(4326);
    let failure = Pipeline::new(config).run().unwrap_err();
    assert_eq!(failure.stage, Stage::ComputeArea);
    assert_eq!(failure.source.kind(), ErrorKind::Precondition);
}

#[test]
fn previous_result_is_replaced() {
    let config = config("replace");
    let destination = config.destination();
    std::fs::write(&destination, "stale").unwrap();

    Pipeline::new(config).run().unwrap();
    assert_eq!(read_back(&destination).len(), 1);
}
