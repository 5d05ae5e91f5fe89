//! Definition overlay: placement and show/hide state.
//!
//! The overlay opens 10 units below and to the right of the pointer. If that
//! would push it past the right or bottom edge of the viewport, it is pulled
//! back so that it ends 10 units inside the edge. At most one overlay is
//! visible; activating another tag replaces it and a click outside any tag
//! hides it.

use serde::Serialize;

use crate::cache::DefinitionCache;

pub const POINTER_OFFSET: f64 = 10.0;
pub const EDGE_MARGIN: f64 = 10.0;
pub const SIMPLE_ENGLISH_LABEL: &str = "Simple English dictionary";

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Top-left corner for an overlay of `overlay` size opened at `pointer`.
///
/// Coordinates never go negative, so an overlay larger than the viewport is
/// pinned to the top-left corner.
pub fn position(pointer: Point, overlay: Size, viewport: Size) -> Point {
    let mut left = pointer.x + POINTER_OFFSET;
    let mut top = pointer.y + POINTER_OFFSET;
    if left + overlay.width > viewport.width {
        left = viewport.width - overlay.width - EDGE_MARGIN;
    }
    if top + overlay.height > viewport.height {
        top = viewport.height - overlay.height - EDGE_MARGIN;
    }
    Point {
        x: left.max(0.0),
        y: top.max(0.0),
    }
}

/// Metadata carried by a rendered tag, as seen by the overlay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TagRef {
    Catalog {
        term: String,
        definition: String,
        source: String,
    },
    SimpleEnglish {
        term: String,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum OverlayEvent {
    Activate { tag: TagRef, pointer: Point },
    DismissClick,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TooltipState {
    pub term: String,
    pub definition: String,
    pub source_label: String,
    pub position: Point,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum OverlayState {
    #[default]
    Hidden,
    Shown(TooltipState),
}

#[derive(Clone, Debug)]
pub struct Overlay {
    state: OverlayState,
    size: Size,
    viewport: Size,
}

impl Overlay {
    pub fn new(size: Size, viewport: Size) -> Self {
        Self {
            state: OverlayState::Hidden,
            size,
            viewport,
        }
    }

    pub fn state(&self) -> &OverlayState {
        &self.state
    }

    /// Applies to the next activation; a visible overlay is not moved.
    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    /// Apply one event. Simple-English tags read their definition from
    /// `cache`; if the cache has none the current state is kept.
    pub fn handle(&mut self, event: OverlayEvent, cache: &DefinitionCache) -> &OverlayState {
        match event {
            OverlayEvent::DismissClick => self.state = OverlayState::Hidden,
            OverlayEvent::Activate { tag, pointer } => {
                let shown = match tag {
                    TagRef::Catalog {
                        term,
                        definition,
                        source,
                    } => Some((term, definition, source)),
                    TagRef::SimpleEnglish { term } => cache
                        .definition(&term)
                        .map(|definition| (term, definition, SIMPLE_ENGLISH_LABEL.to_string())),
                };
                if let Some((term, definition, source_label)) = shown {
                    self.state = OverlayState::Shown(TooltipState {
                        term,
                        definition,
                        source_label,
                        position: position(pointer, self.size, self.viewport),
                    });
                }
            }
        }
        &self.state
    }
}
