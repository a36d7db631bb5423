//! Rectangle arithmetic shared by every pipeline stage.
//!
//! All functions are pure. Intermediate sums use `i64` so `x + width` can
//! never overflow, whatever a caller sends in.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An axis-aligned rectangle in pixel coordinates, origin top-left.
///
/// A `Rect` may be degenerate (non-positive size) or lie partly or wholly
/// outside an image; [`clip`] is what turns it into something drawable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn right(&self) -> i64 {
        i64::from(self.x) + i64::from(self.width)
    }

    fn bottom(&self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}x{})",
            self.x, self.y, self.width, self.height
        )
    }
}

/// Image extent used as the clipping window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn as_rect(&self) -> Rect {
        Rect::new(0, 0, saturate(i64::from(self.width)), saturate(i64::from(self.height)))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("region {rect} has no overlap with a {width}x{height} image")]
    EmptyRegion { rect: Rect, width: u32, height: u32 },
}

/// Intersects `rect` with the image window.
///
/// Fails with [`GeometryError::EmptyRegion`] when nothing of positive area
/// remains, which includes rectangles that were degenerate to begin with.
pub fn clip(rect: &Rect, bounds: Bounds) -> Result<Rect, GeometryError> {
    intersect(rect, &bounds.as_rect()).ok_or(GeometryError::EmptyRegion {
        rect: *rect,
        width: bounds.width,
        height: bounds.height,
    })
}

/// Scales origin and size by `factor`, rounding to the nearest pixel.
///
/// Non-finite or non-positive factors collapse the rectangle to zero size
/// at its scaled origin, so a later [`clip`] rejects it.
pub fn scale(rect: &Rect, factor: f64) -> Rect {
    let apply = |v: i32| saturate((f64::from(v) * factor).round() as i64);
    if !factor.is_finite() || factor <= 0.0 {
        let origin = |v: i32| if factor.is_finite() { apply(v) } else { 0 };
        return Rect::new(origin(rect.x), origin(rect.y), 0, 0);
    }
    Rect::new(
        apply(rect.x),
        apply(rect.y),
        apply(rect.width),
        apply(rect.height),
    )
}

/// Overlap of two rectangles, or `None` when they share no positive area.
pub fn intersect(a: &Rect, b: &Rect) -> Option<Rect> {
    if is_degenerate(a) || is_degenerate(b) {
        return None;
    }
    let x1 = i64::from(a.x).max(i64::from(b.x));
    let y1 = i64::from(a.y).max(i64::from(b.y));
    let x2 = a.right().min(b.right());
    let y2 = a.bottom().min(b.bottom());
    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some(Rect::new(
        saturate(x1),
        saturate(y1),
        saturate(x2 - x1),
        saturate(y2 - y1),
    ))
}

/// Pixel area; zero for degenerate rectangles.
pub fn area(rect: &Rect) -> u64 {
    if is_degenerate(rect) {
        return 0;
    }
    rect.width as u64 * rect.height as u64
}

/// True when `rect` has positive size and lies entirely inside `bounds`.
pub fn contains(bounds: Bounds, rect: &Rect) -> bool {
    !is_degenerate(rect)
        && rect.x >= 0
        && rect.y >= 0
        && rect.right() <= i64::from(bounds.width)
        && rect.bottom() <= i64::from(bounds.height)
}

pub fn is_degenerate(rect: &Rect) -> bool {
    rect.width <= 0 || rect.height <= 0
}

fn saturate(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
