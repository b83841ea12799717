//! Persisted shape of a draft: the document and one record per sticker.
//!
//! Records are typed in memory (`RecordPayload` can only hold the payload
//! matching its type) and flattened to the manifest's wire layout through
//! `WireRecord`. A manifest whose `type` disagrees with its populated
//! payload, or that populates zero or several payloads, fails to decode.

use chrono::{DateTime, Utc};
use kurbo::{Affine, Point, Rect, Size};
use sd_core::{Color, PersistedGeometry, RichText, StickerType, SvgText, Tint};
use serde::{Deserialize, Serialize};

/// One persisted editing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftDocument {
    pub id: String,
    pub svg_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Paint order; `stickers[i].z_index == i` at save time.
    pub stickers: Vec<StickerRecord>,
}

/// Persisted form of a shape sticker. The vector content itself is
/// recovered by re-extracting the source asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeRecord {
    pub node_index: usize,
    pub opacity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tint: Option<Tint>,
}

/// Persisted form of a user image; pixels live in `images/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub image_file_name: String,
    pub alpha: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tint: Option<Color>,
    pub template_mode: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordPayload {
    SvgText(SvgText),
    SvgShape(ShapeRecord),
    RichText(RichText),
    UserImage(ImageRecord),
}

impl RecordPayload {
    pub fn sticker_type(&self) -> StickerType {
        match self {
            RecordPayload::SvgText(_) => StickerType::SvgText,
            RecordPayload::SvgShape(_) => StickerType::SvgShape,
            RecordPayload::RichText(_) => StickerType::RichText,
            RecordPayload::UserImage(_) => StickerType::UserImage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireRecord", into = "WireRecord")]
pub struct StickerRecord {
    pub bounds: Rect,
    pub center: Point,
    pub transform: Affine,
    pub z_index: usize,
    pub locked: bool,
    pub hidden: bool,
    pub payload: RecordPayload,
}

impl StickerRecord {
    pub fn sticker_type(&self) -> StickerType {
        self.payload.sticker_type()
    }

    pub fn geometry(&self) -> PersistedGeometry {
        PersistedGeometry {
            bounds: self.bounds,
            center: self.center,
            transform: self.transform,
        }
    }
}

/// Deterministic raster file name for the user image at `z_index`.
pub fn image_file_name(z_index: usize) -> String {
    format!("userImage_{z_index}.png")
}

// ─── Wire layout ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRecord {
    #[serde(rename = "type")]
    kind: StickerType,
    bounds_x: f64,
    bounds_y: f64,
    bounds_width: f64,
    bounds_height: f64,
    center_x: f64,
    center_y: f64,
    /// `[a, b, c, d, tx, ty]`
    transform: Vec<f64>,
    z_index: usize,
    is_locked: bool,
    is_hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    svg_text: Option<SvgText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    svg_image: Option<ShapeRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vc_text: Option<RichText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vc_image: Option<ImageRecord>,
}

impl From<StickerRecord> for WireRecord {
    fn from(record: StickerRecord) -> Self {
        let kind = record.sticker_type();
        let mut wire = WireRecord {
            kind,
            bounds_x: record.bounds.x0,
            bounds_y: record.bounds.y0,
            bounds_width: record.bounds.width(),
            bounds_height: record.bounds.height(),
            center_x: record.center.x,
            center_y: record.center.y,
            transform: record.transform.as_coeffs().to_vec(),
            z_index: record.z_index,
            is_locked: record.locked,
            is_hidden: record.hidden,
            svg_text: None,
            svg_image: None,
            vc_text: None,
            vc_image: None,
        };
        match record.payload {
            RecordPayload::SvgText(p) => wire.svg_text = Some(p),
            RecordPayload::SvgShape(p) => wire.svg_image = Some(p),
            RecordPayload::RichText(p) => wire.vc_text = Some(p),
            RecordPayload::UserImage(p) => wire.vc_image = Some(p),
        }
        wire
    }
}

impl TryFrom<WireRecord> for StickerRecord {
    type Error = String;

    fn try_from(wire: WireRecord) -> Result<Self, Self::Error> {
        let payload = match (wire.kind, wire.svg_text, wire.svg_image, wire.vc_text, wire.vc_image) {
            (StickerType::SvgText, Some(p), None, None, None) => RecordPayload::SvgText(p),
            (StickerType::SvgShape, None, Some(p), None, None) => RecordPayload::SvgShape(p),
            (StickerType::RichText, None, None, Some(p), None) => RecordPayload::RichText(p),
            (StickerType::UserImage, None, None, None, Some(p)) => RecordPayload::UserImage(p),
            (kind, ..) => return Err(format!("{kind} record must carry exactly one matching payload")),
        };

        let transform = match wire.transform.as_slice() {
            &[a, b, c, d, e, f] => Affine::new([a, b, c, d, e, f]),
            other => return Err(format!("transform needs 6 values, found {}", other.len())),
        };

        Ok(StickerRecord {
            bounds: Rect::from_origin_size(
                (wire.bounds_x, wire.bounds_y),
                Size::new(wire.bounds_width, wire.bounds_height),
            ),
            center: Point::new(wire.center_x, wire.center_y),
            transform,
            z_index: wire.z_index,
            locked: wire.is_locked,
            hidden: wire.is_hidden,
            payload,
        })
    }
}
