//! Continuous colour ramp shared by the static and interactive maps.
//!
//! Fill colour follows the value's position within the observed range, not
//! its class; the class boundaries only annotate the legend.

/// Fill for regions without a value.
pub const NO_DATA: [u8; 3] = [0xf0, 0xf0, 0xf0];
/// Dot colour of the no-data hatch.
pub const NO_DATA_HATCH: [u8; 3] = [0xa0, 0xa0, 0xa0];
pub const OUTLINE: [u8; 3] = [0xff, 0xff, 0xff];

/// Viridis sampled at nine evenly spaced stops.
const VIRIDIS: [[u8; 3]; 9] = [
    [0x44, 0x01, 0x54],
    [0x47, 0x2d, 0x7b],
    [0x3b, 0x52, 0x8b],
    [0x2c, 0x72, 0x8e],
    [0x21, 0x91, 0x8c],
    [0x28, 0xae, 0x80],
    [0x5e, 0xc9, 0x62],
    [0xad, 0xdc, 0x30],
    [0xfd, 0xe7, 0x25],
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorRamp {
    pub vmin: f64,
    pub vmax: f64,
}

impl ColorRamp {
    /// Ramp spanning the given values; `[0, 1]` when there are none.
    pub fn from_values(values: &[f64]) -> Self {
        let mut finite = values.iter().copied().filter(|v| v.is_finite());
        let Some(first) = finite.next() else {
            return Self { vmin: 0.0, vmax: 1.0 };
        };
        let (vmin, vmax) = finite.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        Self { vmin, vmax }
    }

    /// Position of `value` in the ramp, clamped to `[0, 1]`.
    pub fn position(&self, value: f64) -> f64 {
        if self.vmin == self.vmax {
            return 0.5;
        }
        ((value - self.vmin) / (self.vmax - self.vmin)).clamp(0.0, 1.0)
    }

    pub fn color_for(&self, value: Option<f64>) -> [u8; 3] {
        match value {
            Some(v) if v.is_finite() => interpolate(self.position(v)),
            _ => NO_DATA,
        }
    }

    pub fn hex_for(&self, value: Option<f64>) -> String {
        to_hex(self.color_for(value))
    }
}

/// Colour at `t` in `[0, 1]` along the viridis ramp.
pub fn interpolate(t: f64) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    let pos = t * (VIRIDIS.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(VIRIDIS.len() - 1);
    let frac = pos - lo as f64;

    let (a, b) = (VIRIDIS[lo], VIRIDIS[hi]);
    let mix = |i: usize| (a[i] as f64 * (1.0 - frac) + b[i] as f64 * frac).round() as u8;
    [mix(0), mix(1), mix(2)]
}

pub fn to_hex(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}
