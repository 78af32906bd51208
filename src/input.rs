//! Maps pointer clicks on the displayed surface to surface-local points.

use egui::{Pos2, Rect, Vec2};

use crate::model::Point;
use crate::store::AnnotationStore;

/// Where the surface is shown inside `available`: uniformly scaled to fit
/// and centered.
pub fn display_rect(available: Rect, logical: Vec2) -> Rect {
    if logical.x <= 0.0 || logical.y <= 0.0 {
        return Rect::from_min_size(available.min, Vec2::ZERO);
    }
    let scale = (available.width() / logical.x)
        .min(available.height() / logical.y)
        .max(0.0);
    Rect::from_center_size(available.center(), logical * scale)
}

/// Converts a screen position to surface coordinates, undoing both the
/// on-screen offset and the display scaling.
pub fn surface_point(pointer: Pos2, displayed: Rect, logical: Vec2) -> Point {
    let rel = pointer - displayed.min;
    let sx = if displayed.width() > 0.0 {
        logical.x / displayed.width()
    } else {
        1.0
    };
    let sy = if displayed.height() > 0.0 {
        logical.y / displayed.height()
    } else {
        1.0
    };
    Point::new(rel.x * sx, rel.y * sy)
}

/// Adds a point for a click, but only while an image is loaded. Returns
/// whether the click was accepted.
pub fn handle_click(
    store: &mut AnnotationStore,
    image_loaded: bool,
    pointer: Pos2,
    displayed: Rect,
    logical: Vec2,
) -> bool {
    if !image_loaded {
        log::debug!("ignoring click at {pointer:?}: no image loaded");
        return false;
    }
    store.add_point(surface_point(pointer, displayed, logical));
    true
}
