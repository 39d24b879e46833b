//! Brush symmetry and drawing-guide geometry.
//!
//! Everything here is pure geometry in canvas pixel space. Guide overlays
//! are produced as line segments; [`stroke_guides`] rasterises them when a
//! bitmap preview is needed.

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymmetryMode {
    #[default]
    Off,
    Vertical,
    Horizontal,
    Quadrant,
    Radial,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SymmetryState {
    pub mode: SymmetryMode,
    pub center: Point,
    /// Total positions in radial mode, original included
    pub radial_count: u32,
}

impl Default for SymmetryState {
    fn default() -> Self {
        Self {
            mode: SymmetryMode::Off,
            center: Point::new(0.0, 0.0),
            radial_count: 6,
        }
    }
}

/// Positions a brush dab at (x, y) should be painted at.
///
/// The first entry is always the original point.
pub fn get_mirrored_positions(state: &SymmetryState, x: f64, y: f64) -> Vec<Point> {
    let c = state.center;
    let mirror_x = 2.0 * c.x - x;
    let mirror_y = 2.0 * c.y - y;
    let mut points = vec![Point::new(x, y)];

    match state.mode {
        SymmetryMode::Off => {}
        SymmetryMode::Vertical => points.push(Point::new(mirror_x, y)),
        SymmetryMode::Horizontal => points.push(Point::new(x, mirror_y)),
        SymmetryMode::Quadrant => {
            points.push(Point::new(mirror_x, y));
            points.push(Point::new(x, mirror_y));
            points.push(Point::new(mirror_x, mirror_y));
        }
        SymmetryMode::Radial => {
            let dx = x - c.x;
            let dy = y - c.y;
            let radius = dx.hypot(dy);
            let angle = dy.atan2(dx);
            let step = TAU / f64::from(state.radial_count.max(1));

            for i in 1..state.radial_count {
                let a = angle + step * f64::from(i);
                points.push(Point::new(c.x + radius * a.cos(), c.y + radius * a.sin()));
            }
        }
    }

    points
}

/// A straight overlay line in canvas pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuideLine {
    pub from: Point,
    pub to: Point,
}

impl GuideLine {
    const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            from: Point::new(x1, y1),
            to: Point::new(x2, y2),
        }
    }
}

/// Drawing aid shown under the brush
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DrawingGuide {
    #[default]
    None,
    Grid { spacing: f64 },
    Isometric { spacing: f64 },
    Perspective { rays: u32 },
}

/// Closest two guide lines may sit, in canvas pixels
pub const MIN_GUIDE_SPACING: f64 = 2.0;

/// Most lines a guide family may produce along one axis
pub const MAX_GUIDE_LINES: u32 = 512;

/// Widen `spacing` so that `extent` holds at most [`MAX_GUIDE_LINES`]
fn guide_spacing(spacing: f64, extent: f64) -> f64 {
    spacing
        .max(MIN_GUIDE_SPACING)
        .max(extent / f64::from(MAX_GUIDE_LINES))
}

/// Line segments for a drawing guide over a `width` x `height` canvas
///
/// Spacing is widened and perspective rays capped so the result stays
/// bounded for any input.
pub fn drawing_guide_lines(guide: DrawingGuide, width: f64, height: f64) -> Vec<GuideLine> {
    let mut lines = Vec::new();
    if !(width.is_finite() && height.is_finite()) {
        return lines;
    }

    match guide {
        DrawingGuide::None => {}
        DrawingGuide::Grid { spacing } if spacing > 0.0 => {
            let spacing = guide_spacing(spacing, width.max(height));
            let mut x = spacing;
            while x < width {
                lines.push(GuideLine::new(x, 0.0, x, height));
                x += spacing;
            }
            let mut y = spacing;
            while y < height {
                lines.push(GuideLine::new(0.0, y, width, y));
                y += spacing;
            }
        }
        DrawingGuide::Isometric { spacing } if spacing > 0.0 => {
            // Lines at 30 and 150 degrees; rise across the full width
            let rise = width * (PI / 6.0).tan();
            let spacing = guide_spacing(spacing, (height + 2.0 * rise).max(width / 2.0));
            let mut offset = -rise;
            while offset < height + rise {
                lines.push(GuideLine::new(0.0, offset, width, offset - rise));
                lines.push(GuideLine::new(0.0, offset, width, offset + rise));
                offset += spacing;
            }
            let mut x = 0.0;
            while x <= width {
                lines.push(GuideLine::new(x, 0.0, x, height));
                x += spacing * 2.0;
            }
        }
        DrawingGuide::Perspective { rays } if rays > 0 => {
            let rays = rays.min(MAX_GUIDE_LINES);
            let horizon = height / 2.0;
            lines.push(GuideLine::new(0.0, horizon, width, horizon));

            // Vanishing points sit on the horizon at the left and right edges
            let step = height / f64::from(rays);
            for i in 0..=rays {
                let y = step * f64::from(i);
                lines.push(GuideLine::new(0.0, horizon, width, y));
                lines.push(GuideLine::new(width, horizon, 0.0, y));
            }
        }
        _ => {}
    }

    lines
}

/// Axis lines or radial spokes describing the active symmetry
pub fn symmetry_guide_lines(state: &SymmetryState, width: f64, height: f64) -> Vec<GuideLine> {
    let c = state.center;
    let vertical = GuideLine::new(c.x, 0.0, c.x, height);
    let horizontal = GuideLine::new(0.0, c.y, width, c.y);

    match state.mode {
        SymmetryMode::Off => Vec::new(),
        SymmetryMode::Vertical => vec![vertical],
        SymmetryMode::Horizontal => vec![horizontal],
        SymmetryMode::Quadrant => vec![vertical, horizontal],
        SymmetryMode::Radial => {
            let reach = width.hypot(height);
            let step = TAU / f64::from(state.radial_count.max(1));
            (0..state.radial_count)
                .map(|i| {
                    let a = step * f64::from(i) - PI / 2.0;
                    GuideLine::new(c.x, c.y, c.x + reach * a.cos(), c.y + reach * a.sin())
                })
                .collect()
        }
    }
}

/// Stroke guide lines onto `canvas`; segments are clipped by the canvas
pub fn stroke_guides(canvas: &mut RgbaImage, lines: &[GuideLine], color: Rgba<u8>) {
    for line in lines {
        imageproc::drawing::draw_line_segment_mut(
            canvas,
            (line.from.x as f32, line.from.y as f32),
            (line.to.x as f32, line.to.y as f32),
            color,
        );
    }
}
