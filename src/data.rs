use crate::config::InputConfig;
use crate::error::{DataQualityWarning, PipelineError, Result};
use crate::names::{normalize, normalize_opt};
use crate::types::{GeometryRecord, ValueRecord};
use csv::ReaderBuilder;
use geo::MultiPolygon;
use geojson::GeoJson;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{info, warn};

/// Parsed value source. Rows that failed numeric coercion keep an absent
/// value and are listed in `warnings`.
#[derive(Debug, Default)]
pub struct ValueTable {
    pub records: Vec<ValueRecord>,
    pub warnings: Vec<DataQualityWarning>,
}

pub fn load_values(input: &InputConfig) -> Result<ValueTable> {
    let path = &input.values_csv;
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let table = read_values(file, input)?;
    info!(path = %path.display(), rows = table.records.len(), "loaded value source");
    Ok(table)
}

pub fn read_values<R: Read>(reader: R, input: &InputConfig) -> Result<ValueTable> {
    let delimiter = u8::try_from(input.delimiter).map_err(|_| {
        PipelineError::config(format!(
            "delimiter {:?} is not a single-byte character",
            input.delimiter
        ))
    })?;
    let mut rdr = ReaderBuilder::new().delimiter(delimiter).flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let find = |wanted: &str| {
        headers.iter().position(|h| h.trim().eq_ignore_ascii_case(wanted.trim()))
    };

    let name_idx = find(&input.name_column).ok_or_else(|| {
        PipelineError::config(format!(
            "value source has no '{}' column (headers: {:?})",
            input.name_column,
            headers.iter().collect::<Vec<_>>()
        ))
    })?;
    let value_idx = input.value_columns.iter().find_map(|c| find(c)).ok_or_else(|| {
        PipelineError::config(format!(
            "value source needs one of the columns {:?} (headers: {:?})",
            input.value_columns,
            headers.iter().collect::<Vec<_>>()
        ))
    })?;

    let mut table = ValueTable::default();

    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        // Header is line 1.
        let row = i + 2;
        let name = record.get(name_idx).unwrap_or("").trim().to_string();
        let raw = record.get(value_idx).unwrap_or("");

        let value = parse_number(raw);
        if value.is_none() {
            let warning = DataQualityWarning::UnparseableValue {
                row,
                region: name.clone(),
                raw: raw.to_string(),
            };
            warn!("{warning}");
            table.warnings.push(warning);
        }

        table.records.push(ValueRecord { key: normalize(&name), display_name: name, value });
    }

    Ok(table)
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parsed geometry source. Features that carry no polygon are left out of
/// `records` and listed in `warnings`.
#[derive(Debug, Default)]
pub struct GeometryTable {
    pub records: Vec<GeometryRecord>,
    pub warnings: Vec<DataQualityWarning>,
}

impl GeometryTable {
    fn skip(&mut self, index: usize, display_name: Option<String>, reason: &'static str) {
        let warning = DataQualityWarning::SkippedFeature {
            index,
            region: display_name.unwrap_or_default(),
            reason,
        };
        warn!("{warning}");
        self.warnings.push(warning);
    }
}

pub fn load_geometries(path: &Path, name_field: &str) -> Result<GeometryTable> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .ok_or_else(|| {
            PipelineError::config(format!("geometry file {:?} has no extension", path))
        })?;

    let table = match extension.as_str() {
        "json" | "geojson" => {
            let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
            read_geojson(BufReader::new(file), name_field)?
        }
        "shp" => load_shapefile(path, name_field)?,
        _ => {
            return Err(PipelineError::config(format!("unsupported geometry format: {}", extension)))
        }
    };

    info!(
        path = %path.display(),
        features = table.records.len(),
        skipped = table.warnings.len(),
        "loaded geometry source"
    );
    Ok(table)
}

/// Reads a GeoJSON FeatureCollection. The name property must exist on at
/// least one feature; a feature without it loads with an empty name.
pub fn read_geojson<R: Read>(reader: R, name_field: &str) -> Result<GeometryTable> {
    let collection = match GeoJson::from_reader(reader)? {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(PipelineError::config("geometry source must be a FeatureCollection")),
    };

    let has_field = |f: &geojson::Feature| {
        f.properties.as_ref().is_some_and(|p| p.contains_key(name_field))
    };
    if !collection.features.is_empty() && !collection.features.iter().any(has_field) {
        let available: BTreeSet<&String> = collection
            .features
            .iter()
            .filter_map(|f| f.properties.as_ref())
            .flat_map(|p| p.keys())
            .collect();
        return Err(PipelineError::config(format!(
            "'{}' not found in the properties of any feature (available: {:?})",
            name_field, available
        )));
    }

    let mut table = GeometryTable::default();

    for (i, feature) in collection.features.into_iter().enumerate() {
        let display_name = match feature.properties.as_ref().and_then(|p| p.get(name_field)) {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            Some(_) => None,
            None => {
                warn!(feature = i, field = name_field, "feature has no name property");
                None
            }
        };

        let geometry = match feature.geometry {
            Some(geom) => {
                let geo_geom: geo::Geometry<f64> = geom
                    .value
                    .try_into()
                    .map_err(|e| {
                        PipelineError::config(format!("feature {i}: bad geometry: {e:?}"))
                    })?;
                match geo_geom {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => {
                        table.skip(i, display_name, "not a polygon");
                        continue;
                    }
                }
            }
            None => {
                table.skip(i, display_name, "no geometry");
                continue;
            }
        };

        table.records.push(GeometryRecord {
            key: normalize_opt(display_name.as_deref()),
            display_name: display_name.unwrap_or_default(),
            geometry,
        });
    }

    Ok(table)
}

fn load_shapefile(path: &Path, name_field: &str) -> Result<GeometryTable> {
    use shapefile::dbase::FieldValue;
    use shapefile::Shape;

    let mut reader = shapefile::Reader::from_path(path)?;
    let mut table = GeometryTable::default();

    for (i, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result?;

        // Every record shares the table schema.
        let name_val = record.get(name_field).ok_or_else(|| {
            PipelineError::config(format!(
                "'{}' not found in attribute table of {:?}",
                name_field, path
            ))
        })?;
        let display_name = match name_val {
            FieldValue::Character(s) => s.clone(),
            FieldValue::Memo(s) => Some(s.clone()),
            FieldValue::Numeric(n) => n.map(|n| n.to_string()),
            _ => None,
        };

        let converted: std::result::Result<MultiPolygon<f64>, String> = match shape {
            Shape::Polygon(polygon) => polygon.try_into().map_err(|e| format!("{e:?}")),
            Shape::PolygonM(polygon) => polygon.try_into().map_err(|e| format!("{e:?}")),
            Shape::PolygonZ(polygon) => polygon.try_into().map_err(|e| format!("{e:?}")),
            Shape::NullShape => {
                table.skip(i, display_name, "no geometry");
                continue;
            }
            _ => {
                table.skip(i, display_name, "not a polygon");
                continue;
            }
        };
        let geometry = converted.map_err(|e| {
            PipelineError::config(format!("shape {i}: failed to convert polygon: {e}"))
        })?;

        table.records.push(GeometryRecord {
            key: normalize_opt(display_name.as_deref()),
            display_name: display_name.unwrap_or_default(),
            geometry,
        });
    }

    Ok(table)
}
