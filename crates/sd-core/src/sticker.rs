//! Live, editable stickers.
//!
//! A `Sticker` carries the geometry every kind shares plus exactly one
//! kind-specific payload. The payload is a closed enum, so the type tag can
//! never disagree with the data.

use crate::id::StickerId;
use crate::model::{Color, Drawable, TextAlign, Tint};
use kurbo::{Affine, Point, Rect};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Type tag of a sticker, as persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StickerType {
    SvgText,
    SvgShape,
    RichText,
    UserImage,
}

impl StickerType {
    pub fn as_str(self) -> &'static str {
        match self {
            StickerType::SvgText => "svgText",
            StickerType::SvgShape => "svgShape",
            StickerType::RichText => "richText",
            StickerType::UserImage => "userImage",
        }
    }
}

impl std::fmt::Display for StickerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Payloads ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStroke {
    pub enabled: bool,
    pub color: Color,
    pub width: f64,
}

impl Default for TextStroke {
    fn default() -> Self {
        Self {
            enabled: false,
            color: Color::BLACK,
            width: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextShadow {
    pub enabled: bool,
    pub color: Color,
    pub offset_x: f64,
    pub offset_y: f64,
    pub blur: f64,
    pub opacity: f64,
}

impl Default for TextShadow {
    fn default() -> Self {
        Self {
            enabled: false,
            color: Color::BLACK,
            offset_x: 0.0,
            offset_y: 2.0,
            blur: 4.0,
            opacity: 0.5,
        }
    }
}

/// Text lifted out of a vector asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SvgText {
    pub text: String,
    /// `None` renders with the default font.
    pub font_name: Option<String>,
    pub font_size: f64,
    pub text_color: Color,
    pub alignment: TextAlign,
    pub bold: bool,
    pub italic: bool,
    #[serde(default)]
    pub stroke: TextStroke,
    #[serde(default)]
    pub shadow: TextShadow,
    #[serde(default = "one")]
    pub text_opacity: f64,
}

fn one() -> f64 {
    1.0
}

/// A shape subtree from a vector asset.
///
/// Only `original_node_index`, `opacity` and `tint` survive persistence; the
/// content is recovered by re-extracting the same asset.
#[derive(Debug, Clone, PartialEq)]
pub struct SvgShape {
    pub original_node_index: usize,
    pub content: Drawable,
    pub opacity: f64,
    pub tint: Option<Tint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RichTextShadow {
    pub enabled: bool,
    pub color: Color,
    pub offset_x: f64,
    pub offset_y: f64,
    pub opacity: f64,
    pub radius: f64,
}

impl Default for RichTextShadow {
    fn default() -> Self {
        Self {
            enabled: false,
            color: Color::BLACK,
            offset_x: 0.0,
            offset_y: 5.0,
            opacity: 1.0,
            radius: 4.0,
        }
    }
}

/// Free text typed by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RichText {
    pub text: String,
    pub color: Color,
    pub font_name: Option<String>,
    pub bold: bool,
    pub italic: bool,
    pub alignment: TextAlign,
    #[serde(default)]
    pub line_spacing: f64,
    #[serde(default)]
    pub letter_spacing: f64,
    #[serde(default = "one")]
    pub opacity: f64,
    #[serde(default)]
    pub shadow: RichTextShadow,
}

impl RichText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: Color::BLACK,
            font_name: None,
            bold: false,
            italic: false,
            alignment: TextAlign::Center,
            line_spacing: 0.0,
            letter_spacing: 0.0,
            opacity: 1.0,
            shadow: RichTextShadow::default(),
        }
    }
}

/// A raster image placed by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct UserImage {
    /// Encoded image bytes (PNG), stored verbatim.
    pub image: Arc<[u8]>,
    pub alpha: f64,
    pub tint: Option<Color>,
    /// When set, the image is drawn as a mask filled with `tint`.
    pub template_mode: bool,
}

impl UserImage {
    pub fn new(image: impl Into<Arc<[u8]>>) -> Self {
        Self {
            image: image.into(),
            alpha: 1.0,
            tint: None,
            template_mode: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StickerKind {
    SvgText(SvgText),
    SvgShape(SvgShape),
    RichText(RichText),
    UserImage(UserImage),
}

impl StickerKind {
    pub fn sticker_type(&self) -> StickerType {
        match self {
            StickerKind::SvgText(_) => StickerType::SvgText,
            StickerKind::SvgShape(_) => StickerType::SvgShape,
            StickerKind::RichText(_) => StickerType::RichText,
            StickerKind::UserImage(_) => StickerType::UserImage,
        }
    }
}

// ─── Sticker ─────────────────────────────────────────────────────────────

/// One editable entity of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Sticker {
    pub id: StickerId,
    /// Size rectangle in local space; origin is normally (0, 0).
    pub bounds: Rect,
    /// Position of the bounds' center in the parent (canvas) space.
    pub center: Point,
    /// Applied around `center`.
    pub transform: Affine,
    /// Paint order, 0 = bottom. Owned by the session.
    pub z_index: usize,
    pub locked: bool,
    pub hidden: bool,
    pub kind: StickerKind,
}

impl Sticker {
    /// A sticker with a fresh id, identity transform, centered at `center`.
    pub fn new(kind: StickerKind, bounds: Rect, center: Point) -> Self {
        Self {
            id: StickerId::next(kind.sticker_type()),
            bounds,
            center,
            transform: Affine::IDENTITY,
            z_index: 0,
            locked: false,
            hidden: false,
            kind,
        }
    }

    pub fn sticker_type(&self) -> StickerType {
        self.kind.sticker_type()
    }

    /// Untransformed frame in parent space.
    pub fn frame(&self) -> Rect {
        Rect::from_center_size(self.center, self.bounds.size())
    }

    /// Axis-aligned box covering the transformed sticker in parent space.
    pub fn visual_frame(&self) -> Rect {
        let placed = Affine::translate(self.center.to_vec2()) * self.transform;
        placed.transform_rect_bbox(Rect::from_center_size(Point::ORIGIN, self.bounds.size()))
    }

    /// Source node position for shape stickers.
    pub fn original_node_index(&self) -> Option<usize> {
        match &self.kind {
            StickerKind::SvgShape(shape) => Some(shape.original_node_index),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> StickerState {
        StickerState {
            bounds: self.bounds,
            center: self.center,
            transform: self.transform,
            z_index: self.z_index,
            locked: self.locked,
            hidden: self.hidden,
            kind: self.kind.clone(),
        }
    }

    /// Roll back to a previous snapshot. The id is kept.
    pub fn restore(&mut self, state: &StickerState) {
        self.bounds = state.bounds;
        self.center = state.center;
        self.transform = state.transform;
        self.z_index = state.z_index;
        self.locked = state.locked;
        self.hidden = state.hidden;
        self.kind = state.kind.clone();
    }
}

/// Plain copy of a sticker's editable state, for undo recorders.
#[derive(Debug, Clone, PartialEq)]
pub struct StickerState {
    pub bounds: Rect,
    pub center: Point,
    pub transform: Affine,
    pub z_index: usize,
    pub locked: bool,
    pub hidden: bool,
    pub kind: StickerKind,
}
