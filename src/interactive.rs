//! Leaflet export of the joined regions.
//!
//! Colours are not derived in the browser: the caller passes a style
//! function and each feature carries the style it produced, which Leaflet's
//! per-feature `style` callback returns as-is.

use crate::config::OutputConfig;
use crate::error::Result;
use crate::palette::{to_hex, ColorRamp, OUTLINE};
use crate::types::{BinSet, JoinedRecord};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureStyle {
    pub fill_color: String,
    pub color: String,
    pub weight: f64,
    pub fill_opacity: f64,
}

impl FeatureStyle {
    pub fn for_value(ramp: &ColorRamp, value: Option<f64>) -> Self {
        Self {
            fill_color: ramp.hex_for(value),
            color: to_hex(OUTLINE),
            weight: 0.7,
            fill_opacity: 0.9,
        }
    }
}

#[cfg(feature = "interactive")]
pub fn render_interactive<F>(
    joined: &[JoinedRecord],
    bins: Option<&BinSet>,
    style: F,
    output: &OutputConfig,
) -> Result<String>
where
    F: Fn(Option<f64>) -> FeatureStyle,
{
    let regions = script_json(&regions_json(joined, &style)?)?;
    let fields = script_json(&serde_json::json!([
        ["name", output.region_label],
        ["value", output.value_label],
    ]))?;
    let layer_name = script_json(&serde_json::Value::from(output.layer_name.as_str()))?;
    let center = script_json(&serde_json::json!(output.center))?;
    let title = crate::render::title_text(&output.title, bins);

    Ok(TEMPLATE
        .replace("__CENTER__", &center)
        .replace("__ZOOM__", &output.zoom.to_string())
        .replace("__FIELDS__", &fields)
        .replace("__LAYER_NAME__", &layer_name)
        .replace("__LEGEND__", &legend_html(joined, bins, &style, output))
        .replace("__TITLE__", &escape_html(&title))
        .replace("__REGIONS__", &regions))
}

#[cfg(not(feature = "interactive"))]
pub fn render_interactive<F>(
    _joined: &[JoinedRecord],
    _bins: Option<&BinSet>,
    _style: F,
    _output: &OutputConfig,
) -> Result<String>
where
    F: Fn(Option<f64>) -> FeatureStyle,
{
    Err(crate::error::PipelineError::EnvironmentUnavailable(
        "built without the `interactive` feature; rebuild with --features interactive".to_string(),
    ))
}

/// GeoJSON FeatureCollection with `name`, `value` and `style` properties.
pub fn regions_json<F>(joined: &[JoinedRecord], style: &F) -> Result<serde_json::Value>
where
    F: Fn(Option<f64>) -> FeatureStyle,
{
    let mut features = Vec::with_capacity(joined.len());
    for record in joined {
        let mut props = geojson::JsonObject::new();
        props.insert("name".to_string(), record.display_name.clone().into());
        props.insert("value".to_string(), json_number(record.value));
        props.insert("style".to_string(), serde_json::to_value(style(record.value))?);

        features.push(geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&record.geometry))),
            id: None,
            properties: Some(props),
            foreign_members: None,
        });
    }

    let collection = geojson::FeatureCollection { bbox: None, features, foreign_members: None };
    Ok(serde_json::to_value(&collection)?)
}

// Whole counts serialize without a trailing ".0" so tooltips read naturally.
fn json_number(value: Option<f64>) -> serde_json::Value {
    match value {
        Some(v) if v.fract() == 0.0 && v.abs() < 9.0e15 => serde_json::Value::from(v as i64),
        Some(v) => serde_json::Number::from_f64(v).map_or(serde_json::Value::Null, Into::into),
        None => serde_json::Value::Null,
    }
}

/// JSON safe to inline in a `<script>` element.
#[cfg(feature = "interactive")]
fn script_json(value: &serde_json::Value) -> Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

#[cfg(feature = "interactive")]
fn legend_html<F>(
    joined: &[JoinedRecord],
    bins: Option<&BinSet>,
    style: &F,
    output: &OutputConfig,
) -> String
where
    F: Fn(Option<f64>) -> FeatureStyle,
{
    use crate::render::format_value;

    let mut rows = Vec::new();
    if let Some(bins) = bins {
        for (lo, hi) in bins.ranges() {
            let swatch = style(Some((lo + hi) / 2.0)).fill_color;
            let range = format!("{} to {}", format_value(lo), format_value(hi));
            rows.push(legend_row(&swatch, &range));
        }
    }
    if joined.iter().any(|r| r.value.is_none()) {
        rows.push(legend_row(&style(None).fill_color, "No data"));
    }
    if rows.is_empty() {
        return String::new();
    }
    format!(
        "<div class=\"legend\"><strong>{}</strong>{}</div>",
        escape_html(&output.value_label),
        rows.join("")
    )
}

#[cfg(feature = "interactive")]
fn legend_row(color: &str, label: &str) -> String {
    format!(
        "<div><i style=\"background:{}\"></i>{}</div>",
        escape_html(color),
        escape_html(label)
    )
}

#[cfg_attr(not(feature = "interactive"), allow(dead_code))]
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(feature = "interactive")]
const TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>__TITLE__</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>
html, body, #map { height: 100%; margin: 0; }
.title { position: absolute; top: 10px; left: 60px; z-index: 1000; background: rgba(255,255,255,0.85); padding: 4px 10px; font: 16px sans-serif; }
.legend { position: absolute; bottom: 20px; right: 10px; z-index: 1000; background: rgba(255,255,255,0.9); padding: 6px 10px; font: 12px sans-serif; line-height: 18px; }
.legend i { display: inline-block; width: 18px; height: 12px; margin-right: 6px; border: 1px solid #ccc; }
</style>
</head>
<body>
<div id="map"></div>
<div class="title">__TITLE__</div>
__LEGEND__
<script>
const regions = __REGIONS__;
const tooltipFields = __FIELDS__;

const map = L.map("map").setView(__CENTER__, __ZOOM__);
const base = L.tileLayer("https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png", {
  attribution: "&copy; OpenStreetMap contributors &copy; CARTO",
  subdomains: "abcd",
  maxZoom: 20,
}).addTo(map);

function styleFeature(feature) {
  return feature.properties.style;
}

function tooltipFor(feature) {
  const table = document.createElement("table");
  for (const [field, alias] of tooltipFields) {
    const row = table.insertRow();
    const key = row.insertCell();
    key.textContent = alias;
    key.style.fontWeight = "bold";
    const raw = feature.properties[field];
    row.insertCell().textContent = raw === null || raw === undefined ? "No data" : String(raw);
  }
  return table;
}

const regionLayer = L.geoJSON(regions, {
  style: styleFeature,
  onEachFeature: (feature, layer) => layer.bindTooltip(() => tooltipFor(feature), { sticky: true }),
}).addTo(map);

const overlays = {};
overlays[__LAYER_NAME__] = regionLayer;
L.control.layers({ "CartoDB Positron": base }, overlays).addTo(map);

if (regions.features.length > 0) {
  map.fitBounds(regionLayer.getBounds());
}
</script>
</body>
</html>
"#;
