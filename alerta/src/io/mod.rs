//! Reading and writing feature files.

mod csv_file;
mod geojson_file;
mod shapefile_file;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use geo_types::MultiPolygon;
use serde::{Deserialize, Serialize};

use crate::engine::Source;
use crate::error::{AlertaError, Result};
use crate::feature::FeatureCollection;

/// Container formats the pipeline reads or produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerFormat {
    /// GeoJSON feature collection. Read and written.
    GeoJson,
    /// Comma separated values, geometry as WKT in the last column. Written only.
    Csv,
    /// ESRI Shapefile with its `.dbf` table and optional `.prj`. Read only.
    Shapefile,
}

impl ContainerFormat {
    /// Detects the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("geojson") | Some("json") => Ok(Self::GeoJson),
            Some("csv") => Ok(Self::Csv),
            Some("shp") => Ok(Self::Shapefile),
            _ => Err(AlertaError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Canonical file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::GeoJson => "geojson",
            Self::Csv => "csv",
            Self::Shapefile => "shp",
        }
    }

    /// Returns true if results can be written in this format.
    pub fn is_writable(&self) -> bool {
        !matches!(self, Self::Shapefile)
    }
}

/// Reads a GeoJSON or Shapefile source into a feature collection.
pub fn read_features(source: &Source) -> Result<FeatureCollection<MultiPolygon<f64>>> {
    match ContainerFormat::from_path(&source.path)? {
        ContainerFormat::GeoJson => geojson_file::read(source),
        ContainerFormat::Shapefile => shapefile_file::read(source),
        ContainerFormat::Csv => Err(AlertaError::UnsupportedFormat(format!(
            "{} (csv is an output-only container)",
            source.path.display()
        ))),
    }
}

/// Writes the collection to the destination, replacing it if it exists.
///
/// Data is first written to a temporary file next to the destination, which is then renamed over it, so the
/// destination either keeps its previous content or receives the complete new content.
pub fn write_features(
    features: &FeatureCollection<MultiPolygon<f64>>,
    destination: &Path,
    layer_name: &str,
) -> Result<()> {
    match ContainerFormat::from_path(destination)? {
        ContainerFormat::GeoJson => write_atomically(destination, |writer| {
            geojson_file::write(features, layer_name, writer)
        }),
        ContainerFormat::Csv => {
            write_atomically(destination, |writer| csv_file::write(features, writer))
        }
        ContainerFormat::Shapefile => Err(AlertaError::UnsupportedFormat(format!(
            "{} (shapefile is an input-only container)",
            destination.display()
        ))),
    }
}

fn temporary_path(destination: &Path) -> Result<PathBuf> {
    let file_name = destination
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AlertaError::UnsupportedFormat(destination.display().to_string()))?;

    Ok(destination.with_file_name(format!(".{file_name}.{}.tmp", std::process::id())))
}

fn write_atomically(
    destination: &Path,
    write: impl FnOnce(&mut BufWriter<File>) -> Result<()>,
) -> Result<()> {
    let temporary = temporary_path(destination)?;

    let result = File::create(&temporary)
        .map_err(AlertaError::from)
        .and_then(|file| {
            let mut writer = BufWriter::new(file);
            write(&mut writer)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
            Ok(())
        })
        .and_then(|_| std::fs::rename(&temporary, destination).map_err(AlertaError::from));

    if result.is_err() && temporary.exists() {
        if let Err(err) = std::fs::remove_file(&temporary) {
            log::warn!(
                "Failed to remove temporary file {}: {err}",
                temporary.display()
            );
        }
    }

    result
}
