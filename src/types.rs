use crate::names::RegionKey;
use geo::MultiPolygon;
use serde::Deserialize;

/// One row of the value source.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueRecord {
    pub key: RegionKey,
    pub display_name: String,
    pub value: Option<f64>,
}

/// One feature of the geometry source. Polygons are lifted to multipolygons.
#[derive(Debug, Clone)]
pub struct GeometryRecord {
    pub key: RegionKey,
    pub display_name: String,
    pub geometry: MultiPolygon<f64>,
}

#[derive(Debug, Clone)]
pub struct JoinedRecord {
    pub key: RegionKey,
    pub display_name: String,
    pub geometry: MultiPolygon<f64>,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Quantile,
    Linear,
}

/// Class boundaries shared by both renderers.
///
/// `boundaries` is strictly increasing with at least three entries. Bins are
/// `[b[i], b[i+1])` except the last, which also contains its upper bound.
#[derive(Debug, Clone, PartialEq)]
pub struct BinSet {
    pub boundaries: Vec<f64>,
    pub label: &'static str,
}

impl BinSet {
    pub fn bin_count(&self) -> usize {
        self.boundaries.len().saturating_sub(1)
    }

    pub fn bin_index(&self, value: f64) -> Option<usize> {
        let b = &self.boundaries;
        let last = self.bin_count().checked_sub(1)?;
        if value < b[0] || value > b[last + 1] {
            return None;
        }
        if value == b[last + 1] {
            return Some(last);
        }
        // First boundary strictly greater than value closes its bin.
        let upper = b.partition_point(|&edge| edge <= value);
        Some(upper - 1)
    }

    pub fn ranges(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.boundaries.windows(2).map(|w| (w[0], w[1]))
    }
}
