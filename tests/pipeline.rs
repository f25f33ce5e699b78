use county_choropleth::config::AppConfig;
use county_choropleth::palette::{NO_DATA, NO_DATA_HATCH};
use county_choropleth::pipeline::{self, InteractiveStatus};
use county_choropleth::render::map_frame;
use county_choropleth::{normalize, DataQualityWarning, PipelineError};
use geo::Coord;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn feature(name: &str, x0: f64) -> String {
    format!(
        r#"{{"type": "Feature", "properties": {{"NAME_1": "{name}", "ENGTYPE_1": "County"}},
            "geometry": {{"type": "Polygon", "coordinates": [[[{x0},53.0],[{x1},53.0],[{x1},54.0],[{x0},54.0],[{x0},53.0]]]}}}}"#,
        name = name,
        x0 = x0,
        x1 = x0 + 1.0,
    )
}

fn write_inputs(dir: &Path, csv: &str, names: &[&str]) -> AppConfig {
    let features: Vec<String> =
        names.iter().enumerate().map(|(i, n)| feature(n, -10.0 + i as f64)).collect();
    let geojson =
        format!(r#"{{"type": "FeatureCollection", "features": [{}]}}"#, features.join(","));

    let csv_path = dir.join("wordcounts.csv");
    let geo_path = dir.join("counties.geojson");
    fs::write(&csv_path, csv).unwrap();
    fs::write(&geo_path, geojson).unwrap();

    let mut config = AppConfig::default();
    config.input.values_csv = csv_path;
    config.input.geometry = geo_path;
    config.output.png = dir.join("out/map.png");
    config.output.html = dir.join("out/map.html");
    config.output.dpi = 40;
    config
}

#[test]
fn prefixed_name_joins_bare_geometry_name() {
    let temp = TempDir::new().unwrap();
    let config = write_inputs(temp.path(), "County,ProseWords\nCounty Offaly,500\n", &["Offaly"]);

    let prepared = pipeline::prepare(&config).unwrap();
    let outcome = &prepared.outcome;

    assert_eq!(outcome.joined.len(), 1);
    assert_eq!(outcome.joined[0].key, normalize("County Offaly"));
    assert_eq!(outcome.joined[0].display_name, "Offaly");
    assert_eq!(outcome.joined[0].value, Some(500.0));
    assert!(outcome.mismatches.is_empty());
}

#[test]
fn historical_name_joins_modern_geometry() {
    let temp = TempDir::new().unwrap();
    let config = write_inputs(temp.path(), "County,ProseWords\nKings County,300\n", &["Offaly"]);

    let prepared = pipeline::prepare(&config).unwrap();
    assert_eq!(prepared.outcome.joined[0].value, Some(300.0));
    assert!(prepared.outcome.mismatches.is_empty());
}

#[test]
fn missing_region_is_reported_and_hatched() {
    let temp = TempDir::new().unwrap();
    let csv = "County,ProseWords,PageTitle,Error\n\
               Offaly,500,County Offaly,\n\
               Carlow,700,County Carlow,\n";
    let config = write_inputs(temp.path(), csv, &["Offaly", "Longford", "Carlow"]);

    let summary = pipeline::run(&config).unwrap();
    let outcome = &summary.prepared.outcome;

    assert_eq!(outcome.joined.len(), 3);
    assert_eq!(outcome.joined[1].value, None);
    assert_eq!(outcome.mismatches, vec!["Longford"]);

    let img = image::open(&summary.static_path).unwrap().to_rgba8();
    let frame = map_frame(&outcome.joined, &config.output).unwrap();
    let (x, y) = frame.project(Coord { x: -8.5, y: 53.5 });
    let neutral = [image::Rgba([NO_DATA[0], NO_DATA[1], NO_DATA[2], 255]),
        image::Rgba([NO_DATA_HATCH[0], NO_DATA_HATCH[1], NO_DATA_HATCH[2], 255])];
    assert!(neutral.contains(img.get_pixel(x as u32, y as u32)));

    if cfg!(feature = "interactive") {
        assert_eq!(summary.interactive, InteractiveStatus::Written(config.output.html.clone()));
        let html = fs::read_to_string(&config.output.html).unwrap();
        assert!(html.contains("\"Longford\""));
        assert!(html.contains("#f0f0f0"));
    } else {
        assert!(matches!(summary.interactive, InteractiveStatus::Skipped(_)));
    }
}

#[test]
fn missing_value_column_fails_before_join() {
    let temp = TempDir::new().unwrap();
    let config = write_inputs(temp.path(), "County,Population\nOffaly,82668\n", &["Offaly"]);

    let err = pipeline::run(&config).unwrap_err();
    assert!(matches!(err, PipelineError::Configuration(_)), "{err}");
    assert!(!config.output.png.exists());
}

#[test]
fn missing_name_field_is_configuration_error() {
    let temp = TempDir::new().unwrap();
    let mut config = write_inputs(temp.path(), "County,Words\nOffaly,1\n", &["Offaly"]);
    config.input.name_field = "COUNTYNAME".to_string();

    assert!(pipeline::prepare(&config).unwrap_err().is_configuration());
}

#[test]
fn identical_values_classify_linear() {
    let temp = TempDir::new().unwrap();
    let names = ["Cork", "Kerry", "Clare", "Mayo", "Sligo"];
    let csv: String = std::iter::once("County,Words\n".to_string())
        .chain(names.iter().map(|n| format!("{n},100\n")))
        .collect();
    let config = write_inputs(temp.path(), &csv, &names);

    let prepared = pipeline::prepare(&config).unwrap();
    let bins = prepared.bins.unwrap();
    assert_eq!(bins.label, "Linear");
    assert_eq!(bins.boundaries, vec![99.0, 100.0, 101.0]);
}

#[test]
fn fully_unmatched_dataset_still_renders() {
    let temp = TempDir::new().unwrap();
    let csv = "County,ProseWords\nAntrim,10\n";
    let config = write_inputs(temp.path(), csv, &["Wexford", "Wicklow"]);

    let summary = pipeline::run(&config).unwrap();
    assert!(summary.prepared.bins.is_none());
    assert_eq!(summary.prepared.outcome.mismatches, vec!["Wexford", "Wicklow"]);
    assert_eq!(summary.prepared.outcome.unused_values, vec!["Antrim"]);
    assert!(summary.static_path.exists());
}

#[test]
fn nameless_rows_and_features_stay_unmatched() {
    let temp = TempDir::new().unwrap();
    let mut config = write_inputs(temp.path(), "County,ProseWords\n,999\nKerry,5\n", &["Kerry"]);
    let geojson = format!(
        r#"{{"type": "FeatureCollection", "features": [{},
            {{"type": "Feature", "properties": {{"NAME_1": null}},
              "geometry": {{"type": "Polygon", "coordinates": [[[-6,53],[-5,53],[-5,54],[-6,53]]]}}}},
            {{"type": "Feature", "properties": {{"NAME_1": "Fastnet"}},
              "geometry": {{"type": "Point", "coordinates": [-9.6, 51.4]}}}}]}}"#,
        feature("Kerry", -10.0)
    );
    config.input.geometry = temp.path().join("with_gaps.geojson");
    fs::write(&config.input.geometry, geojson).unwrap();

    let prepared = pipeline::prepare(&config).unwrap();
    let outcome = &prepared.outcome;

    assert_eq!(outcome.joined.len(), 2);
    assert_eq!(outcome.joined[0].value, Some(5.0));
    assert_eq!(outcome.joined[1].value, None);
    assert_eq!(outcome.mismatches, vec![""]);

    let skipped: Vec<_> = prepared.skipped_features().collect();
    assert_eq!(
        skipped,
        vec![&DataQualityWarning::SkippedFeature {
            index: 2,
            region: "Fastnet".to_string(),
            reason: "not a polygon",
        }]
    );
}
