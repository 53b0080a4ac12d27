use std::path::Path;

use alerta_types::Crs;
use geo_types::MultiPolygon;
use shapefile::dbase::{self, FieldValue};
use shapefile::Shape;

use crate::engine::Source;
use crate::error::{AlertaError, Result};
use crate::feature::{AttributeValue, Attributes, FeatureCollection};

pub(super) fn read(source: &Source) -> Result<FeatureCollection<MultiPolygon<f64>>> {
    let mut reader = shapefile::Reader::from_path(&source.path)?;

    let crs = match &source.crs {
        Some(crs) => crs.clone(),
        None => read_prj(&source.path)?,
    };

    let fields = field_names(&source.path)?;
    let schema: Vec<String> = if source.columns.is_empty() {
        fields
    } else {
        source
            .columns
            .iter()
            .filter(|name| fields.contains(name))
            .cloned()
            .collect()
    };

    let mut collection = FeatureCollection::new(crs, schema);
    let mut skipped = 0usize;

    for item in reader.iter_shapes_and_records() {
        let (shape, record) = item?;
        let Some(geometry) = to_multi_polygon(shape)? else {
            skipped += 1;
            continue;
        };

        let attributes: Attributes = collection
            .schema()
            .iter()
            .filter_map(|name| Some((name.clone(), from_field(record.get(name)?.clone()))))
            .collect();

        collection.push(attributes, geometry);
    }

    if skipped > 0 {
        log::warn!(
            "Skipped {skipped} null shapes in {}",
            source.path.display()
        );
    }

    log::debug!(
        "Read {} features from {} ({})",
        collection.len(),
        source.path.display(),
        collection.crs()
    );

    Ok(collection)
}

/// Column names from the dBASE header, in table order.
fn field_names(path: &Path) -> Result<Vec<String>> {
    let reader = dbase::Reader::from_path(path.with_extension("dbf"))?;
    Ok(reader
        .fields()
        .iter()
        .map(|field| field.name().to_string())
        // record deletion marker
        .filter(|name| name != "DeletionFlag")
        .collect())
}

fn read_prj(path: &Path) -> Result<Crs> {
    let prj = path.with_extension("prj");
    let wkt = match std::fs::read_to_string(&prj) {
        Ok(wkt) => wkt,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            log::warn!(
                "{} has no .prj file, assuming {}",
                path.display(),
                Crs::WGS84
            );
            return Ok(Crs::WGS84);
        }
        Err(err) => return Err(err.into()),
    };

    let code = epsg_from_wkt(&wkt).ok_or_else(|| {
        AlertaError::Decoding(format!(
            "unrecognised coordinate system in {}",
            prj.display()
        ))
    })?;

    Ok(Crs::from_epsg(code)?)
}

/// EPSG code of a WKT1 definition, from its authority clause or, for ESRI files that have none, from its name.
fn epsg_from_wkt(wkt: &str) -> Option<u32> {
    if let Some(code) = declared_authority(wkt) {
        return Some(code);
    }

    let name = quoted_after(wkt, "PROJCS[").or_else(|| quoted_after(wkt, "GEOGCS["))?;
    code_from_name(name)
}

/// The outermost authority clause is the last one in the text.
fn declared_authority(wkt: &str) -> Option<u32> {
    let start = wkt.rfind("AUTHORITY[\"EPSG\"")?;
    wkt[start..].split('"').nth(3)?.parse().ok()
}

fn quoted_after<'a>(wkt: &'a str, keyword: &str) -> Option<&'a str> {
    let start = wkt.find(keyword)? + keyword.len();
    wkt[start..].split('"').nth(1)
}

fn code_from_name(name: &str) -> Option<u32> {
    const UTM_ZONE: &str = "UTM_ZONE_";

    // "SIRGAS_2000_UTM_Zone_22S", "WGS 84 / UTM zone 22S", "GCS_SIRGAS_2000"
    let name = name.to_ascii_uppercase().replace([' ', '/'], "_");
    let sirgas = name.contains("SIRGAS") && name.contains("2000");
    let wgs84 = name.contains("WGS") && name.contains("84");

    let Some(index) = name.find(UTM_ZONE) else {
        return match (sirgas, wgs84) {
            (true, _) => Some(4674),
            (false, true) => Some(4326),
            _ => None,
        };
    };

    let zone_text = &name[index + UTM_ZONE.len()..];
    let digits = zone_text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(zone_text.len());
    let zone: u32 = zone_text[..digits].parse().ok()?;
    let south = match zone_text[digits..].chars().next()? {
        'S' => true,
        'N' => false,
        _ => return None,
    };

    match (sirgas, wgs84, south) {
        (true, _, true) => Some(31960 + zone),
        (false, true, true) => Some(32700 + zone),
        (false, true, false) => Some(32600 + zone),
        _ => None,
    }
}

fn to_multi_polygon(shape: Shape) -> Result<Option<MultiPolygon<f64>>> {
    let geometry = match shape {
        Shape::NullShape => return Ok(None),
        Shape::Polygon(polygon) => MultiPolygon::<f64>::from(polygon),
        Shape::PolygonM(polygon) => MultiPolygon::<f64>::from(polygon),
        Shape::PolygonZ(polygon) => MultiPolygon::<f64>::from(polygon),
        other => {
            return Err(AlertaError::Decoding(format!(
                "expected polygonal geometry, got {:?}",
                other.shapetype()
            )))
        }
    };

    Ok(Some(geometry))
}

fn from_field(value: FieldValue) -> AttributeValue {
    match value {
        FieldValue::Character(Some(v)) | FieldValue::Memo(v) => {
            AttributeValue::Text(v.trim_end().to_string())
        }
        FieldValue::Numeric(Some(v)) | FieldValue::Double(v) | FieldValue::Currency(v) => {
            AttributeValue::Float(v)
        }
        FieldValue::Float(Some(v)) => AttributeValue::Float(f64::from(v)),
        FieldValue::Integer(v) => AttributeValue::Integer(i64::from(v)),
        FieldValue::Logical(Some(v)) => AttributeValue::Text(v.to_string()),
        FieldValue::Date(Some(date)) => AttributeValue::Text(format!(
            "{:04}-{:02}-{:02}",
            date.year(),
            date.month(),
            date.day()
        )),
        FieldValue::Character(None)
        | FieldValue::Numeric(None)
        | FieldValue::Float(None)
        | FieldValue::Logical(None)
        | FieldValue::Date(None) => AttributeValue::Null,
        other => AttributeValue::Text(format!("{other:?}")),
    }
}
