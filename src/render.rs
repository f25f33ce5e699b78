use crate::config::OutputConfig;
use crate::error::Result;
use crate::palette::{ColorRamp, NO_DATA, NO_DATA_HATCH, OUTLINE};
use crate::types::{BinSet, JoinedRecord};
use font8x8::{UnicodeFonts, BASIC_FONTS};
use geo::{BoundingRect, Coord, MultiPolygon, Rect};
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

const BACKGROUND: Rgba<u8> = Rgba([0xff, 0xff, 0xff, 0xff]);
const INK: Rgba<u8> = Rgba([0x22, 0x22, 0x22, 0xff]);
const GLYPH: u32 = 8;

fn rgba(rgb: [u8; 3]) -> Rgba<u8> {
    Rgba([rgb[0], rgb[1], rgb[2], 0xff])
}

pub fn title_text(base: &str, bins: Option<&BinSet>) -> String {
    match bins {
        Some(bins) => format!("{} - {} scale", base, bins.label),
        None => base.to_string(),
    }
}

/// Pixel geometry of the page, scaled from a 100 DPI baseline.
struct Layout {
    width: u32,
    height: u32,
    s: f64,
    margin: f64,
    title_h: f64,
    legend_w: f64,
}

impl Layout {
    fn new(output: &OutputConfig) -> Self {
        let (width, height) = output.pixel_size();
        let s = output.dpi as f64 / 100.0;
        Self { width, height, s, margin: 20.0 * s, title_h: 60.0 * s, legend_w: 150.0 * s }
    }

    /// (x, y, w, h) of the map area.
    fn map_area(&self) -> (f64, f64, f64, f64) {
        let w = self.width as f64 - self.legend_w - 2.0 * self.margin;
        let h = self.height as f64 - self.title_h - self.margin;
        (self.margin, self.title_h, w, h)
    }

    fn px(&self, v: f64) -> u32 {
        (v * self.s).round().max(1.0) as u32
    }
}

/// Equirectangular fit of the region extent into the map area, with the
/// x axis shortened by cos(latitude) for geographic coordinates.
#[derive(Debug, Clone, Copy)]
pub struct MapFrame {
    min_x: f64,
    max_y: f64,
    kx: f64,
    scale: f64,
    offset_x: f64,
    offset_y: f64,
}

impl MapFrame {
    fn fit(extent: Rect<f64>, (ax, ay, aw, ah): (f64, f64, f64, f64)) -> Option<Self> {
        if aw <= 0.0 || ah <= 0.0 {
            return None;
        }
        let (min, max) = (extent.min(), extent.max());
        let geographic = min.x >= -180.0 && max.x <= 180.0 && min.y >= -90.0 && max.y <= 90.0;
        let kx = if geographic { ((min.y + max.y) / 2.0).to_radians().cos() } else { 1.0 };

        let dw = ((max.x - min.x) * kx).max(1e-12);
        let dh = (max.y - min.y).max(1e-12);
        let scale = (aw / dw).min(ah / dh);

        Some(Self {
            min_x: min.x,
            max_y: max.y,
            kx,
            scale,
            offset_x: ax + (aw - dw * scale) / 2.0,
            offset_y: ay + (ah - dh * scale) / 2.0,
        })
    }

    pub fn project(&self, c: Coord<f64>) -> (f64, f64) {
        (
            self.offset_x + (c.x - self.min_x) * self.kx * self.scale,
            self.offset_y + (self.max_y - c.y) * self.scale,
        )
    }
}

fn extent(records: &[JoinedRecord]) -> Option<Rect<f64>> {
    records.iter().filter_map(|r| r.geometry.bounding_rect()).reduce(|a, b| {
        Rect::new(
            Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
            Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
        )
    })
}

/// The frame `render_static` projects `joined` with.
pub fn map_frame(joined: &[JoinedRecord], output: &OutputConfig) -> Option<MapFrame> {
    MapFrame::fit(extent(joined)?, Layout::new(output).map_area())
}

#[derive(Clone, Copy)]
enum Fill {
    Solid(Rgba<u8>),
    Hatched { step: u32, dot: u32 },
}

impl Fill {
    fn at(self, x: u32, y: u32) -> Rgba<u8> {
        match self {
            Fill::Solid(c) => c,
            Fill::Hatched { step, dot } => {
                if x % step < dot && (y + step / 2) % step < dot {
                    rgba(NO_DATA_HATCH)
                } else {
                    rgba(NO_DATA)
                }
            }
        }
    }
}

pub fn render_static(
    joined: &[JoinedRecord],
    bins: Option<&BinSet>,
    ramp: &ColorRamp,
    output: &OutputConfig,
) -> RgbaImage {
    let layout = Layout::new(output);
    let mut img = RgbaImage::from_pixel(layout.width, layout.height, BACKGROUND);
    let hatch = Fill::Hatched { step: layout.px(6.0).max(4), dot: layout.px(1.2) };

    // 1. Regions
    if let Some(frame) = map_frame(joined, output) {
        for record in joined {
            let fill = match record.value {
                Some(_) => Fill::Solid(rgba(ramp.color_for(record.value))),
                None => hatch,
            };
            fill_multipolygon(&mut img, &frame, &record.geometry, fill);
        }
        let width = layout.px(0.6);
        for record in joined {
            outline_multipolygon(&mut img, &frame, &record.geometry, width);
        }
    }

    // 2. Title
    let title = title_text(&output.title, bins);
    let max_w = layout.width.saturating_sub(2 * layout.margin as u32);
    let mut scale = layout.px(1.5);
    while scale > 1 && text_width(&title, scale) > max_w {
        scale -= 1;
    }
    let x = (layout.width.saturating_sub(text_width(&title, scale)) / 2) as i64;
    let y = ((layout.title_h - (GLYPH * scale) as f64) / 2.0) as i64;
    draw_text(&mut img, x, y, &title, scale, INK);

    // 3. Legend
    let any_missing = joined.iter().any(|r| r.value.is_none());
    let any_present = joined.iter().any(|r| r.value.is_some());
    draw_legend(&mut img, &layout, bins, ramp, output, any_present, any_missing, hatch);

    img
}

pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

#[allow(clippy::too_many_arguments)]
fn draw_legend(
    img: &mut RgbaImage,
    layout: &Layout,
    bins: Option<&BinSet>,
    ramp: &ColorRamp,
    output: &OutputConfig,
    any_present: bool,
    any_missing: bool,
    hatch: Fill,
) {
    let label_scale = layout.px(1.0);
    let bar_x = layout.width as i64 - layout.legend_w as i64;
    let bar_y = (layout.title_h + 30.0 * layout.s) as i64;
    let bar_w = layout.px(30.0);
    let bar_h = ((layout.height as f64 - layout.title_h - layout.margin) * 0.5).max(2.0) as u32;

    let label_y = bar_y - (layout.px(6.0) + GLYPH * label_scale) as i64;
    draw_text(img, bar_x, label_y, &output.value_label, label_scale, INK);

    // Bar spans the ramp and any padding the bins add around it.
    let (mut lo, mut hi) = (ramp.vmin, ramp.vmax);
    if let Some(bins) = bins {
        lo = lo.min(bins.boundaries[0]);
        hi = hi.max(bins.boundaries[bins.boundaries.len() - 1]);
    }
    let span = if hi > lo { hi - lo } else { 1.0 };
    let row_of = |v: f64| bar_y + ((1.0 - (v - lo) / span) * (bar_h - 1) as f64).round() as i64;

    if any_present {
        for row in 0..bar_h {
            let v = hi - span * row as f64 / (bar_h - 1) as f64;
            let c = rgba(ramp.color_for(Some(v)));
            for col in 0..bar_w {
                put(img, bar_x + col as i64, bar_y + row as i64, c);
            }
        }
    }

    let ticks: Vec<f64> = match bins {
        Some(bins) => bins.boundaries.clone(),
        None if any_present => vec![ramp.vmin, ramp.vmax],
        None => Vec::new(),
    };
    let tick_len = layout.px(6.0) as i64;
    let half_glyph = (GLYPH * label_scale / 2) as i64;
    let text_x = bar_x + bar_w as i64 + tick_len + layout.px(2.0) as i64;
    for v in ticks {
        let y = row_of(v);
        for dx in 0..tick_len {
            put(img, bar_x + bar_w as i64 + dx, y, INK);
        }
        draw_text(img, text_x, y - half_glyph, &format_value(v), label_scale, INK);
    }

    if any_missing {
        let sw_y = bar_y + bar_h as i64 + layout.px(20.0) as i64;
        let sw_h = layout.px(20.0);
        for dy in 0..sw_h {
            for dx in 0..bar_w {
                let (x, y) = (bar_x + dx as i64, sw_y + dy as i64);
                let edge = dx == 0 || dy == 0 || dx == bar_w - 1 || dy == sw_h - 1;
                let c = if edge {
                    rgba(NO_DATA_HATCH)
                } else {
                    hatch.at(x.max(0) as u32, y.max(0) as u32)
                };
                put(img, x, y, c);
            }
        }
        let label_y = sw_y + (sw_h / 2) as i64 - half_glyph;
        draw_text(img, text_x, label_y, "No data", label_scale, INK);
    }
}

pub fn format_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{:.0}", v)
    } else {
        format!("{:.1}", v)
    }
}

fn put(img: &mut RgbaImage, x: i64, y: i64, c: Rgba<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, c);
    }
}

fn projected_edges(frame: &MapFrame, mp: &MultiPolygon<f64>) -> Vec<((f64, f64), (f64, f64))> {
    mp.iter()
        .flat_map(|poly| std::iter::once(poly.exterior()).chain(poly.interiors()))
        .flat_map(|ring| ring.lines())
        .map(|line| (frame.project(line.start), frame.project(line.end)))
        .collect()
}

/// Even-odd scanline fill sampled at pixel centres, so holes stay empty.
fn fill_multipolygon(img: &mut RgbaImage, frame: &MapFrame, mp: &MultiPolygon<f64>, fill: Fill) {
    let edges = projected_edges(frame, mp);
    if edges.is_empty() {
        return;
    }
    let (w, h) = (img.width() as i64, img.height() as i64);
    let y_min = edges.iter().map(|(a, b)| a.1.min(b.1)).fold(f64::INFINITY, f64::min);
    let y_max = edges.iter().map(|(a, b)| a.1.max(b.1)).fold(f64::NEG_INFINITY, f64::max);
    let first = (y_min.floor() as i64).max(0);
    let last = (y_max.ceil() as i64).min(h - 1);

    let mut xs: Vec<f64> = Vec::new();
    for row in first..=last {
        let yc = row as f64 + 0.5;
        xs.clear();
        for &((x0, y0), (x1, y1)) in &edges {
            if (y0 <= yc && y1 > yc) || (y1 <= yc && y0 > yc) {
                xs.push(x0 + (yc - y0) * (x1 - x0) / (y1 - y0));
            }
        }
        xs.sort_by(f64::total_cmp);

        for span in xs.chunks_exact(2) {
            let start = ((span[0] - 0.5).ceil() as i64).max(0);
            let end = ((span[1] - 0.5).ceil() as i64).min(w);
            for col in start..end {
                img.put_pixel(col as u32, row as u32, fill.at(col as u32, row as u32));
            }
        }
    }
}

fn outline_multipolygon(img: &mut RgbaImage, frame: &MapFrame, mp: &MultiPolygon<f64>, width: u32) {
    for ((x0, y0), (x1, y1)) in projected_edges(frame, mp) {
        draw_line(img, (x0 as i64, y0 as i64), (x1 as i64, y1 as i64), width, rgba(OUTLINE));
    }
}

/// Bresenham line stamped with a square brush.
fn draw_line(
    img: &mut RgbaImage,
    (mut x, mut y): (i64, i64),
    (x1, y1): (i64, i64),
    width: u32,
    c: Rgba<u8>,
) {
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let half = (width / 2) as i64;

    loop {
        for bx in 0..width as i64 {
            for by in 0..width as i64 {
                put(img, x + bx - half, y + by - half, c);
            }
        }
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn text_width(text: &str, scale: u32) -> u32 {
    text.chars().count() as u32 * GLYPH * scale
}

/// 8x8 bitmap text; characters outside the basic Latin set render blank.
fn draw_text(img: &mut RgbaImage, x: i64, y: i64, text: &str, scale: u32, c: Rgba<u8>) {
    let step = (GLYPH * scale) as i64;
    for (i, ch) in text.chars().enumerate() {
        let Some(glyph) = BASIC_FONTS.get(ch) else { continue };
        let gx = x + i as i64 * step;
        for (row, bits) in (0u32..).zip(glyph.iter()) {
            for col in 0..GLYPH {
                if bits & (1u8 << col) == 0 {
                    continue;
                }
                for sy in 0..scale {
                    for sx in 0..scale {
                        put(img, gx + (col * scale + sx) as i64, y + (row * scale + sy) as i64, c);
                    }
                }
            }
        }
    }
}
