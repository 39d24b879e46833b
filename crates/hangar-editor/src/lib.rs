//! # Hangar Editor
//!
//! Engine pieces behind the showcase layout editor and the brush canvas.
//!
//! ## Modules
//! - `history` - Undo/redo wrapper around a layout reducer
//! - `layout` - Showcase document model and its reducer
//! - `snap` - Alignment snapping for drag/resize
//! - `stamp` - Deduplicating LRU cache of decoded brush stamps
//! - `symmetry` - Mirrored brush positions and guide overlays

pub mod history;
pub mod layout;
pub mod snap;
pub mod stamp;
pub mod symmetry;

pub use history::{ActionKind, Classify, Command, History, MAX_HISTORY, UndoableReducer};
pub use layout::{
    AspectRatio, Background, Element, ElementKind, ElementPatch, Layout, LayoutAction,
    layout_reducer,
};
pub use snap::{DEFAULT_THRESHOLD, ElementRect, GuideAxis, SnapGuide, SnapResult, calc_snap_guides};
pub use stamp::{FileStampLoader, Stamp, StampCache, StampError, StampLoader};
pub use symmetry::{
    DrawingGuide, GuideLine, Point, SymmetryMode, SymmetryState, drawing_guide_lines,
    get_mirrored_positions, stroke_guides, symmetry_guide_lines,
};
