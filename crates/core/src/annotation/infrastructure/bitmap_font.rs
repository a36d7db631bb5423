//! 8x8 label glyphs from the `font8x8` basic Latin table.
//!
//! Bit 0 of a glyph row is the leftmost column. Glyphs carry their own
//! spacing, so cells are laid out edge to edge. Characters the table lacks
//! render as blank cells.

use font8x8::{UnicodeFonts, BASIC_FONTS};

pub const GLYPH_SIZE: u32 = 8;

/// Unscaled pixel width of `text`.
pub fn text_width(text: &str) -> u32 {
    text.chars().count() as u32 * GLYPH_SIZE
}

/// Lit cells of `text` as unscaled `(column, row)` offsets.
pub fn lit_pixels(text: &str) -> impl Iterator<Item = (u32, u32)> + '_ {
    text.chars().enumerate().flat_map(|(i, c)| {
        let rows = BASIC_FONTS.get(c).unwrap_or([0; 8]);
        let left = i as u32 * GLYPH_SIZE;
        (0..GLYPH_SIZE).flat_map(move |row| {
            (0..GLYPH_SIZE)
                .filter(move |col| rows[row as usize] & (1 << col) != 0)
                .map(move |col| (left + col, row))
        })
    })
}
