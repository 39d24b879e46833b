//! Alignment snapping for element drag and resize.
//!
//! Works in percentage space. Targets are the canvas edges and midline plus
//! the edges and centre of every other element; the active rectangle snaps
//! its nearest edge or centre to the closest target within the threshold,
//! independently per axis.

use serde::{Deserialize, Serialize};

/// Canvas landmarks present on both axes
const CANVAS_TARGETS: [f64; 3] = [0.0, 50.0, 100.0];

/// Default snap distance in percentage points
pub const DEFAULT_THRESHOLD: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRect {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ElementRect {
    /// Left, right, centre
    fn x_lines(&self) -> [f64; 3] {
        [self.x, self.x + self.width, self.x + self.width / 2.0]
    }

    /// Top, bottom, centre
    fn y_lines(&self) -> [f64; 3] {
        [self.y, self.y + self.height, self.y + self.height / 2.0]
    }
}

/// Orientation of a guide line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuideAxis {
    /// Vertical line at an x position
    Vertical,
    /// Horizontal line at a y position
    Horizontal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapGuide {
    pub axis: GuideAxis,
    pub position: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapResult {
    pub snapped_x: Option<f64>,
    pub snapped_y: Option<f64>,
    pub guides: Vec<SnapGuide>,
}

struct Candidate {
    target: f64,
    offset: f64,
    distance: f64,
}

/// Closest (target - line) pair within `threshold`; earlier pairs win ties
fn closest(lines: [f64; 3], targets: &[f64], threshold: f64) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;

    for line in lines {
        for &target in targets {
            let distance = (line - target).abs();
            if distance > threshold {
                continue;
            }
            if best.as_ref().is_none_or(|b| distance < b.distance) {
                best = Some(Candidate {
                    target,
                    offset: target - line,
                    distance,
                });
            }
        }
    }

    best
}

/// Compute the snapped position of `active_rect` against its siblings.
///
/// Nothing snaps when `active_id` or `active_rect` is absent.
pub fn calc_snap_guides(
    elements: &[ElementRect],
    active_id: Option<&str>,
    active_rect: Option<&ElementRect>,
    threshold: f64,
) -> SnapResult {
    let (Some(active_id), Some(active)) = (active_id, active_rect) else {
        return SnapResult::default();
    };

    let mut x_targets = CANVAS_TARGETS.to_vec();
    let mut y_targets = CANVAS_TARGETS.to_vec();
    for el in elements.iter().filter(|el| el.id != active_id) {
        x_targets.extend(el.x_lines());
        y_targets.extend(el.y_lines());
    }

    let mut result = SnapResult::default();

    if let Some(hit) = closest(active.x_lines(), &x_targets, threshold) {
        result.snapped_x = Some(active.x + hit.offset);
        result.guides.push(SnapGuide {
            axis: GuideAxis::Vertical,
            position: hit.target,
        });
    }

    if let Some(hit) = closest(active.y_lines(), &y_targets, threshold) {
        result.snapped_y = Some(active.y + hit.offset);
        result.guides.push(SnapGuide {
            axis: GuideAxis::Horizontal,
            position: hit.target,
        });
    }

    result
}
