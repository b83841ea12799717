//! Scene walker: flattens a layer tree into an ordered list of scene nodes.
//!
//! Pre-order, depth-first. Text layers and shape-bearing subtrees become
//! leaves of the output; plain containers are descended into without
//! emitting anything. Frames are converted into the root's coordinate space
//! as the walk accumulates transforms.

use crate::error::SceneError;
use crate::font::FontRegistry;
use crate::model::*;
use crate::parser::parse_svg;
use crate::properties::extract_text_properties;
use kurbo::{Affine, Rect};
use petgraph::graph::NodeIndex;

/// A text unit lifted out of the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub content: String,
    pub font_size: f64,
    /// `None` renders with the default font.
    pub font_family: Option<String>,
    pub color: Color,
    pub alignment: TextAlign,
    pub bold: bool,
    pub italic: bool,
    /// Root-space bounding box of the text.
    pub frame: Rect,
    /// The layer's own transform. Informational only.
    pub transform: Affine,
}

/// A shape-bearing subtree captured as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeNode {
    /// Position of this node in the walk output.
    pub index: usize,
    /// Untransformed content size, centered on the root-space content center.
    pub frame: Rect,
    /// Linear part of the accumulated root-space transform.
    pub local_transform: Affine,
    pub content: Drawable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneNode {
    Text(TextNode),
    Shape(ShapeNode),
}

impl SceneNode {
    pub fn frame(&self) -> Rect {
        match self {
            SceneNode::Text(t) => t.frame,
            SceneNode::Shape(s) => s.frame,
        }
    }

    pub fn as_shape(&self) -> Option<&ShapeNode> {
        match self {
            SceneNode::Shape(s) => Some(s),
            SceneNode::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextNode> {
        match self {
            SceneNode::Text(t) => Some(t),
            SceneNode::Shape(_) => None,
        }
    }
}

/// Parse source asset bytes and flatten them, resolving fonts against the
/// system snapshot.
pub fn extract(bytes: &[u8]) -> Result<Vec<SceneNode>, SceneError> {
    extract_with_fonts(bytes, FontRegistry::global())
}

pub fn extract_with_fonts(bytes: &[u8], fonts: &FontRegistry) -> Result<Vec<SceneNode>, SceneError> {
    let tree = parse_svg(bytes)?;
    Ok(walk(&tree, fonts))
}

/// Flatten an already-built layer tree.
pub fn walk(tree: &LayerTree, fonts: &FontRegistry) -> Vec<SceneNode> {
    let mut out = Vec::new();
    visit(tree, tree.root, Affine::IDENTITY, fonts, &mut out);
    log::debug!(
        "walked {} layers into {} scene nodes",
        tree.len(),
        out.len()
    );
    out
}

fn visit(tree: &LayerTree, idx: NodeIndex, parent: Affine, fonts: &FontRegistry, out: &mut Vec<SceneNode>) {
    let layer = tree.layer(idx);
    let full = parent * layer.transform;

    if let Some(text) = &layer.text {
        let frame = full.transform_rect_bbox(layer.bounds);
        let props = extract_text_properties(text, frame, fonts);
        out.push(SceneNode::Text(TextNode {
            content: props.content,
            font_size: props.font_size,
            font_family: props.font_family,
            color: props.color,
            alignment: props.alignment,
            bold: props.bold,
            italic: props.italic,
            frame: props.frame,
            transform: layer.transform,
        }));
        return;
    }

    if layer.is_candidate_shape() {
        let leaf = tree.is_leaf(idx);
        if leaf && is_ghost(layer) {
            return;
        }
        if leaf || has_own_content(layer) {
            out.push(SceneNode::Shape(shape_node(tree, idx, full, out.len())));
            return;
        }
        // Pure container: fall through and descend.
    }

    for child in tree.children(idx) {
        visit(tree, child, full, fonts, out);
    }
}

/// A leaf that would draw nothing.
fn is_ghost(layer: &Layer) -> bool {
    !layer.has_fill() && !layer.has_stroke() && !layer.has_contents() && !layer.has_mask()
}

fn has_own_content(layer: &Layer) -> bool {
    layer.has_painted_path() || layer.has_contents() || layer.has_gradient() || layer.has_mask()
}

fn shape_node(tree: &LayerTree, idx: NodeIndex, full: Affine, index: usize) -> ShapeNode {
    let bounds = tree.layer(idx).bounds;
    let center = full * bounds.center();
    let [a, b, c, d, _, _] = full.as_coeffs();

    let mut content = tree.subtree(idx);
    // The sticker's transform carries placement from here on.
    let root = content.root;
    content.graph[root].transform = Affine::IDENTITY;

    ShapeNode {
        index,
        frame: Rect::from_center_size(center, bounds.size()),
        local_transform: Affine::new([a, b, c, d, 0.0, 0.0]),
        content: Drawable::new(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{Point, Shape};
    use pretty_assertions::assert_eq;

    fn square(x: f64, y: f64, size: f64) -> Layer {
        Layer::shape(Rect::new(x, y, x + size, y + size).to_path(0.1))
    }

    fn fonts() -> FontRegistry {
        FontRegistry::default()
    }

    #[test]
    fn ghost_leaf_is_dropped_but_siblings_survive() {
        let mut tree = LayerTree::new(Layer::container(Rect::ZERO));
        let group = tree.add_layer(tree.root, Layer::container(Rect::ZERO));
        tree.add_layer(group, square(0.0, 0.0, 4.0));
        tree.add_layer(group, square(5.0, 5.0, 4.0).with_fill(Paint::Solid(Color::BLACK)));

        let nodes = walk(&tree, &fonts());
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].as_shape().map(|s| s.index), Some(0));
    }

    #[test]
    fn painted_layer_with_children_is_atomic() {
        let mut tree = LayerTree::new(Layer::container(Rect::ZERO));
        let parent = tree.add_layer(
            tree.root,
            square(0.0, 0.0, 20.0).with_fill(Paint::Solid(Color::WHITE)),
        );
        tree.add_layer(parent, square(1.0, 1.0, 2.0).with_fill(Paint::Solid(Color::BLACK)));
        tree.add_layer(parent, square(3.0, 3.0, 2.0).with_fill(Paint::Solid(Color::BLACK)));

        let nodes = walk(&tree, &fonts());
        assert_eq!(nodes.len(), 1);
        let shape = nodes[0].as_shape().unwrap();
        assert_eq!(shape.content.tree().len(), 3);
    }

    #[test]
    fn unpainted_path_with_children_is_descended() {
        let mut tree = LayerTree::new(Layer::container(Rect::ZERO));
        let parent = tree.add_layer(tree.root, square(0.0, 0.0, 20.0));
        tree.add_layer(parent, square(1.0, 1.0, 2.0).with_fill(Paint::Solid(Color::BLACK)));
        tree.add_layer(parent, square(3.0, 3.0, 2.0).with_fill(Paint::Solid(Color::BLACK)));

        let indices: Vec<_> = walk(&tree, &fonts())
            .iter()
            .filter_map(|n| n.as_shape().map(|s| s.index))
            .collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn frames_are_in_root_space() {
        let mut tree = LayerTree::new(Layer::container(Rect::ZERO));
        let outer = tree.add_layer(
            tree.root,
            Layer::container(Rect::ZERO).with_transform(Affine::translate((100.0, 0.0))),
        );
        let inner = tree.add_layer(
            outer,
            Layer::container(Rect::ZERO).with_transform(Affine::translate((0.0, 50.0))),
        );
        tree.add_layer(
            inner,
            square(0.0, 0.0, 10.0)
                .with_fill(Paint::Solid(Color::BLACK))
                .with_transform(Affine::scale(2.0)),
        );

        let nodes = walk(&tree, &fonts());
        let shape = nodes[0].as_shape().unwrap();
        // Content center (5,5) → scale 2 → (10,10) → +(100,50).
        assert_eq!(shape.frame.center(), Point::new(110.0, 60.0));
        assert_eq!(shape.frame.size(), kurbo::Size::new(10.0, 10.0));
        assert_eq!(shape.local_transform, Affine::scale(2.0));
    }

    #[test]
    fn text_stops_descent_and_keeps_order() {
        let mut tree = LayerTree::new(Layer::container(Rect::ZERO));
        let text = tree.add_layer(
            tree.root,
            Layer::text(
                Rect::new(0.0, 0.0, 40.0, 20.0),
                TextLayer {
                    string: "Hello".into(),
                    font_size: 14.0,
                    ..Default::default()
                },
            ),
        );
        // Children of a text layer are never visited.
        tree.add_layer(text, square(0.0, 0.0, 5.0).with_fill(Paint::Solid(Color::BLACK)));
        tree.add_layer(tree.root, square(0.0, 0.0, 5.0).with_fill(Paint::Solid(Color::BLACK)));

        let nodes = walk(&tree, &fonts());
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].as_text().map(|t| t.content.as_str()), Some("Hello"));
        assert_eq!(nodes[1].as_shape().map(|s| s.index), Some(1));
    }

    #[test]
    fn empty_tree_yields_nothing() {
        let tree = LayerTree::new(Layer::container(Rect::ZERO));
        assert!(walk(&tree, &fonts()).is_empty());
    }
}
