//! Showcase layout document and its reducer.
//!
//! Positions and sizes are percentages of the canvas (0-100) so a layout
//! renders the same at any pixel size.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::history::{ActionKind, Classify};
use crate::snap::ElementRect;

/// Smallest width/height an element can be resized to
pub const MIN_ELEMENT_SIZE: f64 = 5.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:3")]
    Landscape,
    #[serde(rename = "3:4")]
    Portrait,
    #[serde(rename = "16:9")]
    Wide,
    #[serde(rename = "9:16")]
    Tall,
}

impl AspectRatio {
    /// Height divided by width
    pub fn height_factor(&self) -> f64 {
        match self {
            Self::Square => 1.0,
            Self::Landscape => 3.0 / 4.0,
            Self::Portrait => 4.0 / 3.0,
            Self::Wide => 9.0 / 16.0,
            Self::Tall => 16.0 / 9.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementKind {
    Image { url: String },
    Text { content: String },
    Sticker { name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: String,
    #[serde(flatten)]
    pub kind: ElementKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub z_index: i32,
    #[serde(default)]
    pub rotation: f64,
}

impl Element {
    pub fn rect(&self) -> ElementRect {
        ElementRect {
            id: self.id.clone(),
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }

    fn place(&mut self, x: f64, y: f64) {
        // Upper bound never drops below the lower one, even for full-width elements
        self.x = nan_to_zero(x).clamp(0.0, (100.0 - self.width).max(0.0));
        self.y = nan_to_zero(y).clamp(0.0, (100.0 - self.height).max(0.0));
    }

    fn resize(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.width = clamp_size(width);
        self.height = clamp_size(height);
        self.place(x, y);
    }
}

fn nan_to_zero(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v }
}

fn clamp_size(v: f64) -> f64 {
    if v.is_nan() {
        MIN_ELEMENT_SIZE
    } else {
        v.clamp(MIN_ELEMENT_SIZE, 100.0)
    }
}

/// Partial update for an element; `None` fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementPatch {
    pub kind: Option<ElementKind>,
    pub rotation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Background {
    Color(String),
    Image(String),
}

impl Default for Background {
    fn default() -> Self {
        Self::Color("#1a1a2e".to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub elements: Vec<Element>,
    #[serde(default)]
    pub background: Background,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    /// Currently selected element (editor-only, never undone)
    #[serde(skip)]
    pub selected: Option<String>,
}

impl Layout {
    pub fn element(&self, id: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    fn element_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.id == id)
    }

    /// Rectangles for snapping, in paint order
    pub fn element_rects(&self) -> Vec<ElementRect> {
        let mut ordered: Vec<&Element> = self.elements.iter().collect();
        ordered.sort_by_key(|e| e.z_index);
        ordered.into_iter().map(Element::rect).collect()
    }

    fn top_z(&self) -> i32 {
        self.elements.iter().map(|e| e.z_index).max().unwrap_or(0)
    }

    fn bottom_z(&self) -> i32 {
        self.elements.iter().map(|e| e.z_index).min().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LayoutAction {
    SetLayout { layout: Layout },
    ApplyTemplate { layout: Layout },
    MoveElement { id: String, x: f64, y: f64 },
    ResizeElement { id: String, x: f64, y: f64, width: f64, height: f64 },
    AddElement { element: Element },
    UpdateElement { id: String, patch: ElementPatch },
    DeleteElement { id: String },
    SetBackground { background: Background },
    SetAspectRatio { aspect_ratio: AspectRatio },
    BringToFront { id: String },
    SendToBack { id: String },
    SelectElement { id: Option<String> },
}

impl Classify for LayoutAction {
    fn kind(&self) -> ActionKind {
        match self {
            Self::SetLayout { .. } => ActionKind::FullReplace,
            Self::ApplyTemplate { .. } => ActionKind::PreservingReplace,
            Self::MoveElement { .. } | Self::ResizeElement { .. } => ActionKind::Batched,
            Self::AddElement { .. }
            | Self::UpdateElement { .. }
            | Self::DeleteElement { .. }
            | Self::SetBackground { .. }
            | Self::SetAspectRatio { .. }
            | Self::BringToFront { .. }
            | Self::SendToBack { .. } => ActionKind::Tracked,
            Self::SelectElement { .. } => ActionKind::Untracked,
        }
    }
}

/// Apply `action` to `state`, returning the same `Arc` when nothing changed
pub fn layout_reducer(state: &Arc<Layout>, action: &LayoutAction) -> Arc<Layout> {
    let mut next = Layout::clone(state);

    match action {
        LayoutAction::SetLayout { layout } | LayoutAction::ApplyTemplate { layout } => {
            next = layout.clone();
            next.selected = None;
            // Loaded documents are untrusted; bring every element back on canvas
            for element in &mut next.elements {
                element.resize(element.x, element.y, element.width, element.height);
            }
        }
        LayoutAction::MoveElement { id, x, y } => {
            if let Some(element) = next.element_mut(id) {
                element.place(*x, *y);
            }
        }
        LayoutAction::ResizeElement {
            id,
            x,
            y,
            width,
            height,
        } => {
            if let Some(element) = next.element_mut(id) {
                element.resize(*x, *y, *width, *height);
            }
        }
        LayoutAction::AddElement { element } => {
            if next.element(&element.id).is_none() {
                let mut element = element.clone();
                element.z_index = next.top_z() + 1;
                element.resize(element.x, element.y, element.width, element.height);
                next.selected = Some(element.id.clone());
                next.elements.push(element);
            }
        }
        LayoutAction::UpdateElement { id, patch } => {
            if let Some(element) = next.element_mut(id) {
                if let Some(kind) = &patch.kind {
                    element.kind = kind.clone();
                }
                if let Some(rotation) = patch.rotation {
                    element.rotation = rotation.rem_euclid(360.0);
                }
            }
        }
        LayoutAction::DeleteElement { id } => {
            next.elements.retain(|e| &e.id != id);
            if next.selected.as_ref() == Some(id) {
                next.selected = None;
            }
        }
        LayoutAction::SetBackground { background } => {
            next.background = background.clone();
        }
        LayoutAction::SetAspectRatio { aspect_ratio } => {
            next.aspect_ratio = *aspect_ratio;
        }
        LayoutAction::BringToFront { id } => {
            let top = next.top_z();
            let alone_on_top = next.elements.iter().filter(|e| e.z_index == top).count() == 1;
            if let Some(element) = next.element_mut(id)
                && !(element.z_index == top && alone_on_top)
            {
                element.z_index = top + 1;
            }
        }
        LayoutAction::SendToBack { id } => {
            let bottom = next.bottom_z();
            let alone_at_bottom = next.elements.iter().filter(|e| e.z_index == bottom).count() == 1;
            if let Some(element) = next.element_mut(id)
                && !(element.z_index == bottom && alone_at_bottom)
            {
                element.z_index = bottom - 1;
            }
        }
        LayoutAction::SelectElement { id } => {
            next.selected = id.clone();
        }
    }

    if next == **state {
        Arc::clone(state)
    } else {
        Arc::new(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{Command, UndoableReducer};

    fn sticker(id: &str, x: f64, y: f64) -> Element {
        Element {
            id: id.to_string(),
            kind: ElementKind::Sticker {
                name: "v-fin".to_string(),
            },
            x,
            y,
            width: 20.0,
            height: 20.0,
            z_index: 0,
            rotation: 0.0,
        }
    }

    fn add(e: Element) -> Command<LayoutAction> {
        Command::Apply(LayoutAction::AddElement { element: e })
    }

    #[test]
    fn test_add_assigns_increasing_z() {
        let state = Arc::new(Layout::default());
        let state = layout_reducer(&state, &LayoutAction::AddElement { element: sticker("a", 0.0, 0.0) });
        let state = layout_reducer(&state, &LayoutAction::AddElement { element: sticker("b", 0.0, 0.0) });
        assert_eq!(state.element("a").unwrap().z_index, 1);
        assert_eq!(state.element("b").unwrap().z_index, 2);
        assert_eq!(state.selected.as_deref(), Some("b"));
    }

    #[test]
    fn test_move_clamps_to_canvas() {
        let state = Arc::new(Layout::default());
        let state = layout_reducer(&state, &LayoutAction::AddElement { element: sticker("a", 0.0, 0.0) });
        let state = layout_reducer(
            &state,
            &LayoutAction::MoveElement {
                id: "a".into(),
                x: 95.0,
                y: -4.0,
            },
        );
        let a = state.element("a").unwrap();
        assert_eq!(a.x, 80.0);
        assert_eq!(a.y, 0.0);
    }

    #[test]
    fn test_resize_respects_minimum() {
        let state = Arc::new(Layout::default());
        let state = layout_reducer(&state, &LayoutAction::AddElement { element: sticker("a", 10.0, 10.0) });
        let state = layout_reducer(
            &state,
            &LayoutAction::ResizeElement {
                id: "a".into(),
                x: 10.0,
                y: 10.0,
                width: 1.0,
                height: 30.0,
            },
        );
        let a = state.element("a").unwrap();
        assert_eq!(a.width, MIN_ELEMENT_SIZE);
        assert_eq!(a.height, 30.0);
    }

    #[test]
    fn test_unknown_element_returns_same_arc() {
        let state = Arc::new(Layout::default());
        let next = layout_reducer(&state, &LayoutAction::DeleteElement { id: "ghost".into() });
        assert!(Arc::ptr_eq(&state, &next));

        let next = layout_reducer(
            &state,
            &LayoutAction::SetAspectRatio {
                aspect_ratio: AspectRatio::Square,
            },
        );
        assert!(Arc::ptr_eq(&state, &next));
    }

    #[test]
    fn test_bring_to_front_when_already_on_top_is_noop() {
        let state = Arc::new(Layout::default());
        let state = layout_reducer(&state, &LayoutAction::AddElement { element: sticker("a", 0.0, 0.0) });
        let state = layout_reducer(&state, &LayoutAction::AddElement { element: sticker("b", 0.0, 0.0) });
        let same = layout_reducer(&state, &LayoutAction::BringToFront { id: "b".into() });
        assert!(Arc::ptr_eq(&state, &same));

        let next = layout_reducer(&state, &LayoutAction::BringToFront { id: "a".into() });
        assert_eq!(next.element("a").unwrap().z_index, 3);
        let order: Vec<String> = next.element_rects().into_iter().map(|r| r.id).collect();
        assert_eq!(order, vec!["b", "a"]);
    }

    #[test]
    fn test_drag_gesture_is_one_undo_step() {
        let mut editor = UndoableReducer::new(layout_reducer, Layout::default());
        editor.dispatch(add(sticker("a", 10.0, 10.0)));

        editor.dispatch(Command::BeginBatch);
        for step in 1..=10 {
            editor.dispatch(Command::Apply(LayoutAction::MoveElement {
                id: "a".into(),
                x: 10.0 + step as f64,
                y: 10.0,
            }));
        }
        editor.dispatch(Command::EndBatch);
        assert_eq!(editor.state().element("a").unwrap().x, 20.0);
        assert_eq!(editor.history().past().len(), 2);

        editor.dispatch(Command::Undo);
        assert_eq!(editor.state().element("a").unwrap().x, 10.0);
        editor.dispatch(Command::Undo);
        assert!(editor.state().elements.is_empty());
    }

    #[test]
    fn test_selection_is_not_undoable() {
        let mut editor = UndoableReducer::new(layout_reducer, Layout::default());
        editor.dispatch(add(sticker("a", 0.0, 0.0)));
        editor.dispatch(Command::Apply(LayoutAction::SelectElement { id: None }));
        assert_eq!(editor.history().past().len(), 1);
        assert!(editor.state().selected.is_none());
    }

    #[test]
    fn test_set_layout_resets_history() {
        let mut editor = UndoableReducer::new(layout_reducer, Layout::default());
        editor.dispatch(add(sticker("a", 0.0, 0.0)));
        let loaded = Layout {
            aspect_ratio: AspectRatio::Wide,
            ..Layout::default()
        };
        editor.dispatch(Command::Apply(LayoutAction::SetLayout { layout: loaded }));
        assert!(!editor.can_undo());
        assert_eq!(editor.state().aspect_ratio, AspectRatio::Wide);
    }

    #[test]
    fn test_oversized_loaded_element_is_normalised() {
        let mut wide = sticker("banner", -10.0, 50.0);
        wide.width = 120.0;
        wide.height = 250.0;
        let loaded = Layout {
            elements: vec![wide],
            ..Layout::default()
        };

        let mut editor = UndoableReducer::new(layout_reducer, Layout::default());
        editor.dispatch(Command::Apply(LayoutAction::SetLayout { layout: loaded }));
        let banner = editor.state().element("banner").unwrap().clone();
        assert_eq!(banner.width, 100.0);
        assert_eq!(banner.height, 100.0);
        assert_eq!((banner.x, banner.y), (0.0, 0.0));

        editor.dispatch(Command::BeginBatch);
        editor.dispatch(Command::Apply(LayoutAction::MoveElement {
            id: "banner".into(),
            x: 1.0,
            y: 1.0,
        }));
        editor.dispatch(Command::EndBatch);
        let banner = editor.state().element("banner").unwrap();
        assert_eq!((banner.x, banner.y), (0.0, 0.0));
    }

    #[test]
    fn test_template_with_nan_geometry_stays_on_canvas() {
        let mut broken = sticker("x", f64::NAN, 40.0);
        broken.width = f64::NAN;
        let template = Layout {
            elements: vec![broken],
            ..Layout::default()
        };
        let state = layout_reducer(
            &Arc::new(Layout::default()),
            &LayoutAction::ApplyTemplate { layout: template },
        );
        let x = state.element("x").unwrap();
        assert_eq!(x.width, MIN_ELEMENT_SIZE);
        assert_eq!(x.x, 0.0);
        assert_eq!(x.y, 40.0);

        let moved = layout_reducer(
            &state,
            &LayoutAction::MoveElement {
                id: "x".into(),
                x: 200.0,
                y: 200.0,
            },
        );
        assert_eq!(moved.element("x").unwrap().x, 100.0 - MIN_ELEMENT_SIZE);
    }

    #[test]
    fn test_action_wire_format() {
        let json = r#"{"action":"MOVE_ELEMENT","id":"a","x":1.0,"y":2.0}"#;
        let action: LayoutAction = serde_json::from_str(json).unwrap();
        assert_eq!(action.kind(), ActionKind::Batched);
    }
}
