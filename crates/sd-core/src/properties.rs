//! Text property extraction from text-bearing layers.

use crate::font::FontRegistry;
use crate::model::{Color, TextAlign, TextLayer};
use kurbo::Rect;

/// Font size used when a layer specifies none.
pub const DEFAULT_FONT_SIZE: f64 = 24.0;

/// Smallest width/height a text frame may have.
pub const MIN_TEXT_FRAME: f64 = 10.0;

/// Editable properties read off a text layer.
#[derive(Debug, Clone, PartialEq)]
pub struct TextProperties {
    pub content: String,
    pub font_size: f64,
    /// Resolved font; `None` means the default font.
    pub font_family: Option<String>,
    pub color: Color,
    pub alignment: TextAlign,
    pub bold: bool,
    pub italic: bool,
    pub frame: Rect,
}

/// Read content, font, color and alignment from `text`.
///
/// `frame` is the layer's frame in root space; it is clamped to
/// [`MIN_TEXT_FRAME`] on both axes around its origin.
pub fn extract_text_properties(text: &TextLayer, frame: Rect, fonts: &FontRegistry) -> TextProperties {
    let styled_font = text.styled.as_ref().and_then(|s| s.font.as_ref());

    let (font_family, font_size, bold, italic) = match styled_font {
        Some(font) => {
            let size = if font.size > 0.0 {
                font.size
            } else {
                fallback_size(text)
            };
            let resolved = fonts.resolve(&font.name, &font.family).into_option();
            (resolved, size, font.traits.bold, font.traits.italic)
        }
        None => (None, fallback_size(text), false, false),
    };

    let color = text
        .styled
        .as_ref()
        .and_then(|s| s.foreground)
        .or(text.foreground)
        .unwrap_or(Color::BLACK);

    let alignment = text
        .alignment_mode
        .as_deref()
        .map(TextAlign::from_mode)
        .unwrap_or_default();

    TextProperties {
        content: text.string.clone(),
        font_size,
        font_family,
        color,
        alignment,
        bold,
        italic,
        frame: validate_frame(frame),
    }
}

fn fallback_size(text: &TextLayer) -> f64 {
    if text.font_size > 0.0 {
        text.font_size
    } else {
        DEFAULT_FONT_SIZE
    }
}

/// Grow a frame to at least [`MIN_TEXT_FRAME`] in each dimension.
pub fn validate_frame(frame: Rect) -> Rect {
    let width = frame.width().max(MIN_TEXT_FRAME);
    let height = frame.height().max(MIN_TEXT_FRAME);
    Rect::from_origin_size(frame.origin(), (width, height))
}
