use crate::classify::classify;
use crate::config::AppConfig;
use crate::data::{load_geometries, load_values};
use crate::error::{DataQualityWarning, PipelineError, Result};
use crate::interactive::{render_interactive, FeatureStyle};
use crate::palette::ColorRamp;
use crate::processing::{join, JoinOutcome};
use crate::render::{encode_png, format_value, render_static};
use crate::types::BinSet;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Joined and classified data, ready for either renderer.
#[derive(Debug)]
pub struct Prepared {
    pub outcome: JoinOutcome,
    pub bins: Option<BinSet>,
    pub ramp: ColorRamp,
    pub warnings: Vec<DataQualityWarning>,
}

impl Prepared {
    /// Geometry features left off the map because they carry no polygon.
    pub fn skipped_features(&self) -> impl Iterator<Item = &DataQualityWarning> {
        self.warnings.iter().filter(|w| matches!(w, DataQualityWarning::SkippedFeature { .. }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractiveStatus {
    Written(PathBuf),
    Skipped(String),
}

#[derive(Debug)]
pub struct RunSummary {
    pub prepared: Prepared,
    pub static_path: PathBuf,
    pub interactive: InteractiveStatus,
}

/// Load, join and classify. Fails only on configuration problems and I/O.
pub fn prepare(config: &AppConfig) -> Result<Prepared> {
    config.validate()?;

    // 1. Load
    let values = load_values(&config.input)?;
    let geometries = load_geometries(&config.input.geometry, &config.input.name_field)?;

    // 2. Join
    let outcome = join(geometries.records, values.records);
    let mut warnings = values.warnings;
    warnings.extend(geometries.warnings);
    for warning in outcome.warnings() {
        warn!("{}", warning);
        warnings.push(warning);
    }

    // 3. Classify
    let present = outcome.present_values();
    let classes = &config.classification;
    let bins = classify(&present, classes.strategy, classes.classes);
    let ramp = ColorRamp::from_values(&present);

    info!(
        regions = outcome.joined.len(),
        with_value = present.len(),
        scale = bins.as_ref().map(|b| b.label),
        "prepared map data"
    );

    Ok(Prepared { outcome, bins, ramp, warnings })
}

pub fn report(prepared: &Prepared) {
    let outcome = &prepared.outcome;
    let unique: HashSet<&str> = outcome.joined.iter().map(|r| r.display_name.as_str()).collect();
    println!("Regions found: {} ({} unique names)\n", outcome.joined.len(), unique.len());

    if !outcome.mismatches.is_empty() {
        let names: Vec<&str> = outcome
            .mismatches
            .iter()
            .map(|m| if m.is_empty() { "(unnamed)" } else { m.as_str() })
            .collect();
        println!("Regions with no value (name mismatch or missing from the value source):");
        println!("{}\n", names.join(", "));
    }

    let unparseable = prepared
        .warnings
        .iter()
        .filter(|w| matches!(w, DataQualityWarning::UnparseableValue { .. }));
    print_warnings("Value rows without a usable number:", unparseable);
    print_warnings("Features skipped (no polygonal geometry):", prepared.skipped_features());

    match &prepared.bins {
        Some(bins) => {
            println!("Classification: {} ({} bins)", bins.label, bins.bin_count());
            let mut counts = vec![0usize; bins.bin_count()];
            for v in outcome.present_values() {
                if let Some(i) = bins.bin_index(v) {
                    counts[i] += 1;
                }
            }
            for ((lo, hi), count) in bins.ranges().zip(counts) {
                println!("  {:>10} - {:<10} {} regions", format_value(lo), format_value(hi), count);
            }
            println!();
        }
        None => println!("Classification: none (no region has a value)\n"),
    }
}

fn print_warnings<'a>(heading: &str, warnings: impl Iterator<Item = &'a DataQualityWarning>) {
    let lines: Vec<String> = warnings.map(ToString::to_string).collect();
    if !lines.is_empty() {
        println!("{}", heading);
        for line in &lines {
            println!("  {}", line);
        }
        println!();
    }
}

pub fn run(config: &AppConfig) -> Result<RunSummary> {
    let prepared = prepare(config)?;
    report(&prepared);

    let joined = &prepared.outcome.joined;
    let bins = prepared.bins.as_ref();
    let output = &config.output;

    // 4. Static map
    let img = render_static(joined, bins, &prepared.ramp, output);
    write_file(&output.png, &encode_png(&img)?)?;
    println!("Saved static map -> {}", output.png.display());

    // 5. Interactive map
    let ramp = prepared.ramp;
    let style = |v| FeatureStyle::for_value(&ramp, v);
    let interactive = match render_interactive(joined, bins, style, output) {
        Ok(document) => {
            write_file(&output.html, document.as_bytes())?;
            println!("Saved interactive map -> {}", output.html.display());
            InteractiveStatus::Written(output.html.clone())
        }
        Err(PipelineError::EnvironmentUnavailable(reason)) => {
            println!("Interactive map skipped: {}", reason);
            InteractiveStatus::Skipped(reason)
        }
        Err(e) => return Err(e),
    };

    Ok(RunSummary { prepared, static_path: output.png.clone(), interactive })
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    fs::write(path, bytes).map_err(|e| PipelineError::io(path, e))
}
