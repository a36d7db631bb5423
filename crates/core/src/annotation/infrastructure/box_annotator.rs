use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect as PixelRect;

use crate::annotation::domain::annotation_style::AnnotationStyle;
use crate::annotation::domain::annotator::{AnnotationError, Annotator};
use crate::detection::domain::face_region::FaceRegion;
use crate::shared::cancellation::CancellationToken;
use crate::shared::geometry::{self, Rect};
use crate::shared::raster::Image;

use super::bitmap_font;

/// Draws a rectangular outline per region with a confidence label above it.
///
/// Outlines grow inward from the clipped region by `stroke_width` pixels.
/// Labels sit on a filled background in the stroke colour, one pixel above
/// the box, pushed down to row 0 when there is no room.
#[derive(Clone, Copy, Debug, Default)]
pub struct BoxAnnotator;

impl BoxAnnotator {
    pub fn new() -> Self {
        Self
    }
}

impl Annotator for BoxAnnotator {
    fn draw(
        &self,
        image: &Image,
        regions: &[FaceRegion],
        style: &AnnotationStyle,
        cancel: &CancellationToken,
    ) -> Result<Image, AnnotationError> {
        let mut canvas = image.to_rgb_image();
        let bounds = image.bounds();

        for (index, region) in regions.iter().enumerate() {
            cancel.check()?;
            let Ok(clipped) = geometry::clip(&region.rect(), bounds) else {
                continue;
            };
            draw_outline(&mut canvas, &clipped, style);
            if let Some(text) = style.label_format().render(index, region.confidence()) {
                draw_label(&mut canvas, &clipped, &text, style);
            }
        }

        Ok(Image::from_rgb(canvas, image.format())?)
    }
}

fn draw_outline(canvas: &mut RgbImage, clipped: &Rect, style: &AnnotationStyle) {
    let color = Rgb(style.stroke_color());
    // rings past the centre are empty
    let max_rings = clipped.width.min(clipped.height) / 2 + 1;
    let rings = i32::try_from(style.stroke_width())
        .unwrap_or(i32::MAX)
        .min(max_rings);
    for inset in 0..rings {
        let width = clipped.width - 2 * inset;
        let height = clipped.height - 2 * inset;
        if width <= 0 || height <= 0 {
            break;
        }
        let ring = PixelRect::at(clipped.x + inset, clipped.y + inset)
            .of_size(width as u32, height as u32);
        draw_hollow_rect_mut(canvas, ring, color);
    }
}

fn draw_label(canvas: &mut RgbImage, clipped: &Rect, text: &str, style: &AnnotationStyle) {
    let scale = style.label_scale();
    let (width, height) = label_size(text, scale);
    let (left, top) = label_origin(clipped, i32::try_from(height).unwrap_or(i32::MAX));

    let background = Rgb(style.stroke_color());
    draw_filled_rect_mut(
        canvas,
        PixelRect::at(left, top).of_size(width, height),
        background,
    );

    let ink = Rgb(text_color(style.stroke_color()));
    let offset = |origin: i32, cell: u32| {
        let step = (cell + 1).saturating_mul(scale);
        origin.saturating_add(i32::try_from(step).unwrap_or(i32::MAX))
    };
    for (col, row) in bitmap_font::lit_pixels(text) {
        let cell = PixelRect::at(offset(left, col), offset(top, row)).of_size(scale, scale);
        draw_filled_rect_mut(canvas, cell, ink);
    }
}

/// Background size of a label, including one scaled pixel of padding.
fn label_size(text: &str, scale: u32) -> (u32, u32) {
    let scaled = |cells: u32| cells.saturating_add(2).saturating_mul(scale);
    (
        scaled(bitmap_font::text_width(text)),
        scaled(bitmap_font::GLYPH_SIZE),
    )
}

/// Top-left of a label: left-aligned with the box, bottom edge one pixel
/// above it, never above row 0.
fn label_origin(clipped: &Rect, label_height: i32) -> (i32, i32) {
    let top = clipped.y.saturating_sub(label_height).saturating_sub(1);
    (clipped.x, top.max(0))
}

/// Black text on light backgrounds, white on dark (Rec. 601 luma).
fn text_color([r, g, b]: [u8; 3]) -> [u8; 3] {
    let luma = 299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b);
    if luma >= 128_000 {
        [0, 0, 0]
    } else {
        [255, 255, 255]
    }
}
