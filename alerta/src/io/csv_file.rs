use std::io::Write;

use geo_types::MultiPolygon;
use geozero::ToWkt;

use crate::error::{AlertaError, Result};
use crate::feature::FeatureCollection;

const GEOMETRY_COLUMN: &str = "geometry";

/// Writes the schema columns followed by the geometry as WKT. Null values are written as empty cells.
pub(super) fn write(
    features: &FeatureCollection<MultiPolygon<f64>>,
    writer: &mut impl Write,
) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let header = features
        .schema()
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(GEOMETRY_COLUMN));
    csv_writer.write_record(header)?;

    for feature in features.iter() {
        let wkt = geo_types::Geometry::MultiPolygon(feature.geometry.clone())
            .to_wkt()
            .map_err(|err| {
                AlertaError::Decoding(format!(
                    "failed to encode geometry of feature {} as WKT: {err}",
                    feature.id()
                ))
            })?;

        let mut record: Vec<String> = features
            .schema()
            .iter()
            .map(|name| {
                feature
                    .get(name)
                    .and_then(|value| value.to_text())
                    .unwrap_or_default()
            })
            .collect();
        record.push(wkt);

        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}
