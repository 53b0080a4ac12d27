use std::io::Write;

use alerta_types::Crs;
use geo_types::MultiPolygon;
use geojson::{GeoJson, JsonObject, JsonValue};
use serde_json::json;

use crate::engine::Source;
use crate::error::{AlertaError, Result};
use crate::feature::{AttributeValue, Attributes, FeatureCollection};

pub(super) fn read(source: &Source) -> Result<FeatureCollection<MultiPolygon<f64>>> {
    let text = std::fs::read_to_string(&source.path)?;
    let geojson: GeoJson = text.parse()?;

    let (features, foreign_members) = match geojson {
        GeoJson::FeatureCollection(fc) => (fc.features, fc.foreign_members),
        GeoJson::Feature(feature) => (vec![feature], None),
        GeoJson::Geometry(_) => {
            return Err(AlertaError::Decoding(format!(
                "{} contains a bare geometry, expected features",
                source.path.display()
            )))
        }
    };

    let crs = match &source.crs {
        Some(crs) => crs.clone(),
        None => match foreign_members.as_ref().and_then(|m| m.get("crs")) {
            Some(member) => crs_from_member(member)?,
            None => Crs::WGS84,
        },
    };

    let schema = schema(source, &features);
    let mut collection = FeatureCollection::new(crs, schema);
    let mut skipped = 0usize;

    for feature in features {
        let Some(geometry) = feature.geometry else {
            skipped += 1;
            continue;
        };

        let geometry = to_multi_polygon(geometry.value)?;
        let attributes: Attributes = feature
            .properties
            .unwrap_or_default()
            .into_iter()
            .filter(|(name, _)| collection.has_field(name))
            .map(|(name, value)| (name, from_json(value)))
            .collect();

        collection.push(attributes, geometry);
    }

    if skipped > 0 {
        log::warn!(
            "Skipped {skipped} features without geometry in {}",
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

/// Requested columns that exist in the data, or every column if none were requested.
///
/// A collection without features has nothing to check the requested columns against, so they are taken as is.
fn schema(source: &Source, features: &[geojson::Feature]) -> Vec<String> {
    if features.is_empty() {
        return source.columns.clone();
    }

    let present = |name: &str| {
        features
            .iter()
            .any(|f| f.properties.as_ref().is_some_and(|p| p.contains_key(name)))
    };

    if source.columns.is_empty() {
        let mut names: Vec<String> = Vec::new();
        for properties in features.iter().filter_map(|f| f.properties.as_ref()) {
            for name in properties.keys() {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }

        names
    } else {
        source
            .columns
            .iter()
            .filter(|name| present(name))
            .cloned()
            .collect()
    }
}

/// Parses the legacy named CRS member, e.g. `{"type": "name", "properties": {"name": "EPSG:4674"}}`.
fn crs_from_member(member: &JsonValue) -> Result<Crs> {
    let name = member
        .pointer("/properties/name")
        .and_then(|n| n.as_str())
        .ok_or_else(|| AlertaError::Decoding(format!("unsupported crs member {member}")))?;

    if name.ends_with("CRS84") {
        return Ok(Crs::WGS84);
    }

    let code = name
        .rsplit(':')
        .next()
        .and_then(|c| c.parse::<u32>().ok())
        .ok_or_else(|| AlertaError::Decoding(format!("unsupported crs name `{name}`")))?;

    Ok(Crs::from_epsg(code)?)
}

fn to_multi_polygon(value: geojson::Value) -> Result<MultiPolygon<f64>> {
    match geo_types::Geometry::<f64>::try_from(value)? {
        geo_types::Geometry::Polygon(polygon) => Ok(MultiPolygon::new(vec![polygon])),
        geo_types::Geometry::MultiPolygon(multi_polygon) => Ok(multi_polygon),
        other => Err(AlertaError::Decoding(format!(
            "expected polygonal geometry, got {other:?}"
        ))),
    }
}

fn from_json(value: JsonValue) -> AttributeValue {
    match value {
        JsonValue::Null => AttributeValue::Null,
        JsonValue::Bool(v) => AttributeValue::Text(v.to_string()),
        JsonValue::Number(n) => match n.as_i64() {
            Some(v) => AttributeValue::Integer(v),
            None => n
                .as_f64()
                .map(AttributeValue::Float)
                .unwrap_or(AttributeValue::Null),
        },
        JsonValue::String(v) => AttributeValue::Text(v),
        other => AttributeValue::Text(other.to_string()),
    }
}

fn to_json(value: &AttributeValue) -> JsonValue {
    match value {
        AttributeValue::Null => JsonValue::Null,
        AttributeValue::Integer(v) => JsonValue::from(*v),
        AttributeValue::Float(v) => serde_json::Number::from_f64(*v)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        AttributeValue::Text(v) => JsonValue::String(v.clone()),
    }
}

pub(super) fn write(
    features: &FeatureCollection<MultiPolygon<f64>>,
    layer_name: &str,
    writer: &mut impl Write,
) -> Result<()> {
    let geojson_features = features
        .iter()
        .map(|feature| {
            let properties: JsonObject = features
                .schema()
                .iter()
                .map(|name| {
                    let value = feature.get(name).map(to_json).unwrap_or(JsonValue::Null);
                    (name.clone(), value)
                })
                .collect();

            geojson::Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::from(
                    &feature.geometry,
                ))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    let mut members = JsonObject::new();
    members.insert("name".to_string(), JsonValue::from(layer_name));
    members.insert(
        "crs".to_string(),
        json!({
            "type": "name",
            "properties": {
                "name": format!("urn:ogc:def:crs:EPSG::{}", features.crs().code())
            }
        }),
    );

    let collection = geojson::FeatureCollection {
        bbox: None,
        features: geojson_features,
        foreign_members: Some(members),
    };

    serde_json::to_writer(writer, &collection)?;
    Ok(())
}
