//! JSON summaries printed by the CLI.

use kurbo::{Affine, Point, Rect};
use sd_core::{SceneNode, Sticker, StickerKind};
use sd_draft::{DraftDocument, Restored};
use serde_json::{Value, json};

fn rect(r: Rect) -> Value {
    json!([r.x0, r.y0, r.x1, r.y1])
}

fn point(p: Point) -> Value {
    json!([p.x, p.y])
}

fn affine(t: Affine) -> Value {
    json!(t.as_coeffs())
}

pub fn scene_node(position: usize, node: &SceneNode) -> Value {
    match node {
        SceneNode::Text(text) => json!({
            "position": position,
            "kind": "text",
            "content": text.content,
            "fontFamily": text.font_family,
            "fontSize": text.font_size,
            "color": text.color.to_hex(),
            "alignment": text.alignment,
            "frame": rect(text.frame),
        }),
        SceneNode::Shape(shape) => json!({
            "position": position,
            "kind": "shape",
            "index": shape.index,
            "layers": shape.content.tree().len(),
            "frame": rect(shape.frame),
            "transform": affine(shape.local_transform),
        }),
    }
}

pub fn sticker(sticker: &Sticker) -> Value {
    let detail = match &sticker.kind {
        StickerKind::SvgText(t) => json!({ "text": t.text, "font": t.font_name }),
        StickerKind::RichText(t) => json!({ "text": t.text, "font": t.font_name }),
        StickerKind::SvgShape(s) => json!({ "nodeIndex": s.original_node_index, "opacity": s.opacity }),
        StickerKind::UserImage(i) => json!({ "bytes": i.image.len(), "alpha": i.alpha }),
    };
    json!({
        "id": sticker.id,
        "type": sticker.sticker_type(),
        "zIndex": sticker.z_index,
        "bounds": rect(sticker.bounds),
        "center": point(sticker.center),
        "transform": affine(sticker.transform),
        "locked": sticker.locked,
        "hidden": sticker.hidden,
        "detail": detail,
    })
}

pub fn draft_summary(doc: &DraftDocument) -> Value {
    json!({
        "id": doc.id,
        "svgName": doc.svg_name,
        "createdAt": doc.created_at,
        "updatedAt": doc.updated_at,
        "stickers": doc.stickers.len(),
    })
}

pub fn restored(restored: &Restored) -> Value {
    json!({
        "draft": draft_summary(&restored.document),
        "partial": restored.is_partial(),
        "stickers": restored.stickers.iter().map(sticker).collect::<Vec<_>>(),
        "skipped": restored.skipped.iter().map(|s| json!({
            "position": s.position,
            "type": s.sticker_type,
            "reason": s.reason.to_string(),
        })).collect::<Vec<_>>(),
    })
}
