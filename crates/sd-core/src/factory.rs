//! Scene node → live sticker.

use crate::sticker::*;
use crate::walker::{SceneNode, ShapeNode, TextNode};
use kurbo::{Point, Rect};

/// Padding conventions applied when turning scene nodes into stickers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactoryConfig {
    /// Added on every side of a node's frame.
    pub content_padding: f64,
    /// Extra horizontal room for text, on each side.
    pub text_horizontal_padding: f64,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            content_padding: 8.0,
            text_horizontal_padding: 12.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EntityFactory {
    pub config: FactoryConfig,
}

impl EntityFactory {
    pub fn new(config: FactoryConfig) -> Self {
        Self { config }
    }

    /// Build a sticker with a fresh id.
    pub fn make_sticker(&self, node: &SceneNode) -> Sticker {
        match node {
            SceneNode::Text(text) => self.text_sticker(text),
            SceneNode::Shape(shape) => self.shape_sticker(shape),
        }
    }

    /// Build one sticker per node, in node order.
    pub fn make_stickers(&self, nodes: &[SceneNode]) -> Vec<Sticker> {
        nodes.iter().map(|node| self.make_sticker(node)).collect()
    }

    fn text_sticker(&self, node: &TextNode) -> Sticker {
        let pad = self.config.content_padding;
        let frame = node.frame.inflate(pad + self.config.text_horizontal_padding, pad);
        let payload = SvgText {
            text: node.content.clone(),
            font_name: node.font_family.clone(),
            font_size: node.font_size,
            text_color: node.color,
            alignment: node.alignment,
            bold: node.bold,
            italic: node.italic,
            stroke: TextStroke::default(),
            shadow: TextShadow::default(),
            text_opacity: 1.0,
        };
        // The text node's own transform is already folded into its frame.
        Sticker::new(StickerKind::SvgText(payload), local_bounds(frame), frame.center())
    }

    fn shape_sticker(&self, node: &ShapeNode) -> Sticker {
        let pad = self.config.content_padding;
        let frame = node.frame.inflate(pad, pad);
        let payload = SvgShape {
            original_node_index: node.index,
            content: node.content.clone(),
            opacity: 1.0,
            tint: None,
        };
        let mut sticker = Sticker::new(StickerKind::SvgShape(payload), local_bounds(frame), frame.center());
        sticker.transform = node.local_transform;
        sticker
    }
}

fn local_bounds(frame: Rect) -> Rect {
    Rect::from_origin_size(Point::ORIGIN, frame.size())
}

/// Shorthand for `EntityFactory::default().make_sticker(node)`.
pub fn make_sticker(node: &SceneNode) -> Sticker {
    EntityFactory::default().make_sticker(node)
}
