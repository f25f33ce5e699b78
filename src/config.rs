use crate::classify::MAX_CLASSES;
use crate::error::{PipelineError, Result};
use crate::types::Strategy;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub classification: ClassificationConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    pub values_csv: PathBuf,
    pub geometry: PathBuf, // .geojson/.json or .shp
    pub name_field: String, // feature property holding the county name
    pub name_column: String,
    pub value_columns: Vec<String>, // accepted headers, first match wins
    pub delimiter: char,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            values_csv: PathBuf::from("irish_county_wikipedia_prose_wordcounts.csv"),
            geometry: PathBuf::from("gadm41_IRL_1.json"),
            name_field: "NAME_1".to_string(),
            name_column: "County".to_string(),
            value_columns: vec!["ProseWords".to_string(), "Words".to_string()],
            delimiter: ',',
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClassificationConfig {
    pub strategy: Strategy,
    pub classes: usize,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self { strategy: Strategy::Quantile, classes: 5 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub png: PathBuf,
    pub html: PathBuf,
    pub dpi: u32,
    pub width_in: f64,
    pub height_in: f64,
    pub title: String,
    pub region_label: String,
    pub value_label: String,
    pub layer_name: String,
    pub center: [f64; 2], // [lat, lon]
    pub zoom: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            png: PathBuf::from("ireland_counties_wordcount.png"),
            html: PathBuf::from("ireland_counties_wordcount.html"),
            dpi: 200,
            width_in: 8.5,
            height_in: 10.0,
            title: "Wikipedia Prose Word Count by County (Republic of Ireland)".to_string(),
            region_label: "County".to_string(),
            value_label: "Prose words".to_string(),
            layer_name: "Word count".to_string(),
            center: [53.4, -7.9],
            zoom: 6,
        }
    }
}

impl OutputConfig {
    /// Raster size in pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        let px = |inches: f64| (inches * self.dpi as f64).round().max(1.0) as u32;
        (px(self.width_in), px(self.height_in))
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let classes = self.classification.classes;
        if !(2..=MAX_CLASSES).contains(&classes) {
            return Err(PipelineError::config(format!(
                "classification.classes must be between 2 and {MAX_CLASSES}, got {classes}"
            )));
        }
        if self.input.value_columns.is_empty() {
            return Err(PipelineError::config("input.value_columns must name at least one column"));
        }
        let out = &self.output;
        if out.dpi == 0 || !(out.width_in > 0.0) || !(out.height_in > 0.0) {
            return Err(PipelineError::config(
                "output dpi, width_in and height_in must be positive",
            ));
        }
        Ok(())
    }
}
