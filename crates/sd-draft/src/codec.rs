//! Live stickers ⇄ draft records.
//!
//! Encoding is pure: it yields the records plus the raster files the
//! package must hold. Reconstruction re-binds shape records to freshly
//! extracted scene nodes by position and replays persisted geometry.

use crate::error::{DraftError, SkipReason};
use crate::record::*;
use sd_core::{
    EntityFactory, LayoutHost, SceneNode, Sticker, StickerKind, StickerType, UserImage, apply_persisted_geometry,
};
use std::path::Path;
use std::sync::Arc;

/// A raster file to be written under the package's `images/` directory.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterFile {
    pub file_name: String,
    pub bytes: Arc<[u8]>,
}

/// Records and rasters for one save.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Encoded {
    pub records: Vec<StickerRecord>,
    pub images: Vec<RasterFile>,
}

/// Build one record per sticker; `z_index` is the array position.
pub fn encode(stickers: &[Sticker]) -> Encoded {
    let mut out = Encoded::default();
    for (z_index, sticker) in stickers.iter().enumerate() {
        let payload = match &sticker.kind {
            StickerKind::SvgText(text) => RecordPayload::SvgText(text.clone()),
            StickerKind::RichText(text) => RecordPayload::RichText(text.clone()),
            StickerKind::SvgShape(shape) => RecordPayload::SvgShape(ShapeRecord {
                node_index: shape.original_node_index,
                opacity: shape.opacity,
                tint: shape.tint.clone(),
            }),
            StickerKind::UserImage(image) => {
                let file_name = image_file_name(z_index);
                out.images.push(RasterFile {
                    file_name: file_name.clone(),
                    bytes: image.image.clone(),
                });
                RecordPayload::UserImage(ImageRecord {
                    image_file_name: file_name,
                    alpha: image.alpha,
                    tint: image.tint,
                    template_mode: image.template_mode,
                })
            }
        };
        out.records.push(StickerRecord {
            bounds: sticker.bounds,
            center: sticker.center,
            transform: sticker.transform,
            z_index,
            locked: sticker.locked,
            hidden: sticker.hidden,
            payload,
        });
    }
    out
}

/// Pretty JSON manifest text.
pub fn manifest_json(doc: &DraftDocument) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(doc)
}

/// Decode manifest bytes read from `path`.
pub fn decode_manifest(bytes: &[u8], path: &Path) -> Result<DraftDocument, DraftError> {
    serde_json::from_slice(bytes).map_err(|source| DraftError::MalformedDocument {
        path: path.to_path_buf(),
        source,
    })
}

/// A record left out of a restore.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRecord {
    /// Position of the record in the manifest.
    pub position: usize,
    pub sticker_type: StickerType,
    pub reason: SkipReason,
}

/// Rebuild live stickers from `doc`.
///
/// `nodes` is a fresh extraction of the package's source asset and
/// `raster` looks up user image files by name. Stickers come back sorted
/// by persisted `z_index` with persisted geometry applied through `host`.
pub fn reconstruct(
    doc: &DraftDocument,
    nodes: &[SceneNode],
    raster: &dyn Fn(&str) -> Option<Vec<u8>>,
    factory: &EntityFactory,
    host: &mut dyn LayoutHost,
) -> (Vec<Sticker>, Vec<SkippedRecord>) {
    let mut built: Vec<(&StickerRecord, Sticker)> = Vec::with_capacity(doc.stickers.len());
    let mut skipped = Vec::new();

    for (position, record) in doc.stickers.iter().enumerate() {
        match build(record, nodes, raster, factory) {
            Ok(sticker) => built.push((record, sticker)),
            Err(reason) => {
                log::warn!("draft {}: skipping {} record #{position}: {reason}", doc.id, record.sticker_type());
                skipped.push(SkippedRecord {
                    position,
                    sticker_type: record.sticker_type(),
                    reason,
                });
            }
        }
    }

    built.sort_by_key(|(record, _)| record.z_index);

    let stickers = built
        .into_iter()
        .map(|(record, mut sticker)| {
            sticker.z_index = record.z_index;
            sticker.locked = record.locked;
            sticker.hidden = record.hidden;
            apply_persisted_geometry(&mut sticker, &record.geometry(), host);
            sticker
        })
        .collect();

    (stickers, skipped)
}

fn build(
    record: &StickerRecord,
    nodes: &[SceneNode],
    raster: &dyn Fn(&str) -> Option<Vec<u8>>,
    factory: &EntityFactory,
) -> Result<Sticker, SkipReason> {
    let kind = match &record.payload {
        RecordPayload::SvgText(text) => StickerKind::SvgText(text.clone()),
        RecordPayload::RichText(text) => StickerKind::RichText(text.clone()),
        RecordPayload::SvgShape(shape) => {
            let node = nodes
                .get(shape.node_index)
                .filter(|n| n.as_shape().is_some())
                .ok_or(SkipReason::StaleNodeReference {
                    node_index: shape.node_index,
                    node_count: nodes.len(),
                })?;
            let mut sticker = factory.make_sticker(node);
            if let StickerKind::SvgShape(payload) = &mut sticker.kind {
                payload.opacity = shape.opacity;
                payload.tint = shape.tint.clone();
                payload.original_node_index = shape.node_index;
            }
            return Ok(sticker);
        }
        RecordPayload::UserImage(image) => {
            let bytes = raster(&image.image_file_name).ok_or_else(|| SkipReason::MissingRasterAsset {
                file: image.image_file_name.clone(),
            })?;
            StickerKind::UserImage(UserImage {
                image: bytes.into(),
                alpha: image.alpha,
                // Tint only means something for template images.
                tint: image.tint.filter(|_| image.template_mode),
                template_mode: image.template_mode,
            })
        }
    };
    Ok(Sticker::new(kind, record.bounds, record.center))
}
