//! Core data model: colors, paints, and the layer tree.
//!
//! A source asset is loaded into a `LayerTree`, a read-only arena of
//! `Layer` values where edges go parent → child and children keep document
//! order. The tree is built once per extraction and never mutated after the
//! loader hands it over; the scene walker only borrows it.

use kurbo::{Affine, BezPath, Rect};
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

// ─── Colors ──────────────────────────────────────────────────────────────

/// RGBA color, one byte per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Parse a hex color string: `#RGB`, `#RRGGBB`, `#RRGGBBAA`.
    ///
    /// The `#` is optional and surrounding whitespace is ignored. Any other
    /// length or a non-hex digit yields `None`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();

        let pair = |i: usize| -> Option<u8> { Some(hex_val(bytes[i])? << 4 | hex_val(bytes[i + 1])?) };

        match bytes.len() {
            3 => {
                let r = hex_val(bytes[0])?;
                let g = hex_val(bytes[1])?;
                let b = hex_val(bytes[2])?;
                Some(Self::rgb(r * 17, g * 17, b * 17))
            }
            6 => Some(Self::rgb(pair(0)?, pair(2)?, pair(4)?)),
            8 => Some(Self::rgba(pair(0)?, pair(2)?, pair(4)?, pair(6)?)),
            _ => None,
        }
    }

    /// Parse a hex color, substituting `fallback` for anything unparseable.
    pub fn from_hex_or(hex: &str, fallback: Color) -> Self {
        Self::from_hex(hex).unwrap_or(fallback)
    }

    /// Emit as `#RRGGBBAA` (always eight digits, uppercase).
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
    }

    /// Scale the alpha channel by `factor` (clamped to 0..=1).
    pub fn with_alpha_factor(self, factor: f64) -> Self {
        let a = (self.a as f64 * factor.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::from_hex(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid hex color {s:?}")))
    }
}

// ─── Paint ───────────────────────────────────────────────────────────────

/// A gradient stop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub offset: f32, // 0.0 .. 1.0
    pub color: Color,
}

pub type GradientStops = SmallVec<[GradientStop; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientKind {
    Linear,
    Radial,
}

/// Fill or stroke paint of a layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    Solid(Color),
    Gradient {
        kind: GradientKind,
        stops: GradientStops,
    },
}

impl Paint {
    pub fn is_gradient(&self) -> bool {
        matches!(self, Paint::Gradient { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub paint: Paint,
    pub width: f64,
}

/// Color overlay applied to a shape sticker.
///
/// Either one color or an ordered list of stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Tint {
    Solid(Color),
    Gradient(GradientStops),
}

// ─── Text ────────────────────────────────────────────────────────────────

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
    Justified,
    Natural,
}

impl TextAlign {
    /// Map a raw alignment mode name. Unrecognized names fall back to center.
    pub fn from_mode(mode: &str) -> Self {
        match mode {
            "left" => TextAlign::Left,
            "right" => TextAlign::Right,
            "center" => TextAlign::Center,
            "justified" => TextAlign::Justified,
            "natural" => TextAlign::Natural,
            _ => TextAlign::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FontTraits {
    pub bold: bool,
    pub italic: bool,
}

/// The rendering font attached to styled text content.
#[derive(Debug, Clone, PartialEq)]
pub struct FontDescriptor {
    /// Full face name, e.g. `Arial-BoldMT`.
    pub name: String,
    pub family: String,
    pub size: f64,
    pub traits: FontTraits,
}

/// Attributes of the first run of styled text content.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextAttributes {
    pub font: Option<FontDescriptor>,
    pub foreground: Option<Color>,
}

/// Text carried by a text-bearing layer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextLayer {
    pub string: String,
    /// Present when the content is styled (font / color attributes).
    pub styled: Option<TextAttributes>,
    /// The layer's own font size (used when no styled font is present).
    pub font_size: f64,
    /// The layer's own foreground color.
    pub foreground: Option<Color>,
    /// Raw alignment mode name (`left`, `center`, ...).
    pub alignment_mode: Option<String>,
}

// ─── Layers ──────────────────────────────────────────────────────────────

/// Pixel contents of an image layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageContents {
    /// Inline `data:` URI payload or external reference, kept verbatim.
    Href(String),
    Bytes(Arc<[u8]>),
}

/// One node of the layer tree.
#[derive(Debug, Clone, Default)]
pub struct Layer {
    /// Source element id, if any.
    pub name: Option<String>,
    /// Content rectangle in the layer's own coordinate space.
    pub bounds: Rect,
    /// Layer space → parent space.
    pub transform: Affine,
    /// Shape geometry (in layer space).
    pub path: Option<BezPath>,
    pub fill: Option<Paint>,
    pub stroke: Option<Stroke>,
    pub contents: Option<ImageContents>,
    /// Clip-path or mask reference.
    pub mask: Option<String>,
    pub text: Option<TextLayer>,
}

impl Layer {
    /// A pure grouping layer.
    pub fn container(bounds: Rect) -> Self {
        Self {
            bounds,
            ..Default::default()
        }
    }

    /// A shape layer whose bounds are the path's bounding box.
    pub fn shape(path: BezPath) -> Self {
        let bounds = path_bounds(&path);
        Self {
            bounds,
            path: Some(path),
            ..Default::default()
        }
    }

    pub fn image(bounds: Rect, contents: ImageContents) -> Self {
        Self {
            bounds,
            contents: Some(contents),
            ..Default::default()
        }
    }

    pub fn text(bounds: Rect, text: TextLayer) -> Self {
        Self {
            bounds,
            text: Some(text),
            ..Default::default()
        }
    }

    pub fn with_fill(mut self, paint: Paint) -> Self {
        self.fill = Some(paint);
        self
    }

    pub fn with_mask(mut self, mask: impl Into<String>) -> Self {
        self.mask = Some(mask.into());
        self
    }

    pub fn with_transform(mut self, transform: Affine) -> Self {
        self.transform = transform;
        self
    }

    pub fn has_fill(&self) -> bool {
        self.fill.is_some()
    }

    pub fn has_stroke(&self) -> bool {
        self.stroke.is_some()
    }

    pub fn has_contents(&self) -> bool {
        self.contents.is_some()
    }

    pub fn has_mask(&self) -> bool {
        self.mask.is_some()
    }

    pub fn has_gradient(&self) -> bool {
        self.fill.as_ref().is_some_and(Paint::is_gradient)
            || self.stroke.as_ref().is_some_and(|s| s.paint.is_gradient())
    }

    /// A path that actually paints (filled or stroked).
    pub fn has_painted_path(&self) -> bool {
        self.path.is_some() && (self.has_fill() || self.has_stroke())
    }

    /// Carries paintable content of its own: a fill/stroke path, pixel
    /// contents, a gradient, or a clipping mask.
    pub fn is_candidate_shape(&self) -> bool {
        self.path.is_some() || self.has_contents() || self.has_gradient() || self.has_mask()
    }
}

/// Bounding box of a path; empty paths have zero bounds.
pub fn path_bounds(path: &BezPath) -> Rect {
    use kurbo::Shape;
    if path.elements().is_empty() {
        return Rect::ZERO;
    }
    path.bounding_box()
}

// ─── Layer Tree ──────────────────────────────────────────────────────────

/// Read-only arena of layers built from one source asset.
#[derive(Debug, Clone)]
pub struct LayerTree {
    pub graph: StableDiGraph<Layer, ()>,
    pub root: NodeIndex,
}

impl LayerTree {
    /// Create a tree holding only `root`.
    #[must_use]
    pub fn new(root: Layer) -> Self {
        let mut graph = StableDiGraph::new();
        let root = graph.add_node(root);
        Self { graph, root }
    }

    /// Add a layer as the last child of `parent`.
    pub fn add_layer(&mut self, parent: NodeIndex, layer: Layer) -> NodeIndex {
        let idx = self.graph.add_node(layer);
        self.graph.add_edge(parent, idx, ());
        idx
    }

    pub fn layer(&self, idx: NodeIndex) -> &Layer {
        &self.graph[idx]
    }

    /// Children in insertion (document) order.
    ///
    /// Sorted by `NodeIndex` so the result does not depend on how petgraph
    /// iterates its adjacency list.
    pub fn children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut children: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .collect();
        children.sort();
        children
    }

    pub fn is_leaf(&self, idx: NodeIndex) -> bool {
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .next()
            .is_none()
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Copy the subtree rooted at `idx` into a standalone tree.
    pub fn subtree(&self, idx: NodeIndex) -> LayerTree {
        let mut out = LayerTree::new(self.graph[idx].clone());
        let root = out.root;
        self.copy_children(idx, &mut out, root);
        out
    }

    fn copy_children(&self, from: NodeIndex, out: &mut LayerTree, to: NodeIndex) {
        for child in self.children(from) {
            let copied = out.add_layer(to, self.graph[child].clone());
            self.copy_children(child, out, copied);
        }
    }
}

/// Shared handle to the vector content a shape sticker draws.
///
/// Cloning is cheap; equality is identity of the underlying subtree.
#[derive(Clone)]
pub struct Drawable(Arc<LayerTree>);

impl Drawable {
    pub fn new(tree: LayerTree) -> Self {
        Self(Arc::new(tree))
    }

    pub fn tree(&self) -> &LayerTree {
        &self.0
    }

    pub fn root_layer(&self) -> &Layer {
        self.0.layer(self.0.root)
    }
}

impl PartialEq for Drawable {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Drawable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Drawable")
            .field("layers", &self.0.len())
            .field("name", &self.root_layer().name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Shape;
    use pretty_assertions::assert_eq;

    #[test]
    fn hex_decode_forms() {
        assert_eq!(Color::from_hex("#FF0000"), Some(Color::rgba(255, 0, 0, 255)));
        assert_eq!(Color::from_hex("#f00"), Some(Color::rgba(255, 0, 0, 255)));
        assert_eq!(Color::from_hex("12345678"), Some(Color::rgba(0x12, 0x34, 0x56, 0x78)));
        assert_eq!(Color::from_hex(" #abc "), Some(Color::rgb(0xAA, 0xBB, 0xCC)));
    }

    #[test]
    fn hex_decode_rejects_other_lengths() {
        assert_eq!(Color::from_hex("#FFFF"), None);
        assert_eq!(Color::from_hex(""), None);
        assert_eq!(Color::from_hex("#GG0000"), None);
        assert_eq!(Color::from_hex_or("#12345", Color::WHITE), Color::WHITE);
    }

    #[test]
    fn hex_encode_is_eight_digits() {
        assert_eq!(Color::rgba(255, 0, 0, 255).to_hex(), "#FF0000FF");
        assert_eq!(Color::rgba(1, 2, 3, 0).to_hex(), "#01020300");
    }

    #[test]
    fn hex_roundtrip_all_channels() {
        for v in (0..=255u8).step_by(17) {
            for a in [0u8, 1, 128, 254, 255] {
                let c = Color::rgba(v, 255 - v, v / 2, a);
                assert_eq!(Color::from_hex(&c.to_hex()), Some(c));
            }
        }
    }

    #[test]
    fn short_hex_roundtrips_within_nibble() {
        let c = Color::from_hex("#9C4").unwrap();
        let short = format!("#{:X}{:X}{:X}", c.r >> 4, c.g >> 4, c.b >> 4);
        assert_eq!(short, "#9C4");
        assert_eq!(Color::from_hex(&short), Some(c));
    }

    #[test]
    fn alignment_mapping_defaults_to_center() {
        assert_eq!(TextAlign::from_mode("left"), TextAlign::Left);
        assert_eq!(TextAlign::from_mode("justified"), TextAlign::Justified);
        assert_eq!(TextAlign::from_mode("start"), TextAlign::Center);
    }

    #[test]
    fn candidate_and_ghost_predicates() {
        let ghost = Layer::shape(Rect::new(0.0, 0.0, 10.0, 10.0).to_path(0.1));
        assert!(ghost.is_candidate_shape());
        assert!(!ghost.has_painted_path());

        let filled = ghost.clone().with_fill(Paint::Solid(Color::BLACK));
        assert!(filled.has_painted_path());

        let group = Layer::container(Rect::ZERO);
        assert!(!group.is_candidate_shape());
        assert!(group.clone().with_mask("clip1").is_candidate_shape());
    }

    #[test]
    fn subtree_copies_descendants_in_order() {
        let named = |name: &str| Layer {
            name: Some(name.to_string()),
            ..Layer::container(Rect::ZERO)
        };
        let mut tree = LayerTree::new(Layer::container(Rect::ZERO));
        let group = tree.add_layer(tree.root, named("g"));
        tree.add_layer(group, named("a"));
        tree.add_layer(group, named("b"));

        let sub = tree.subtree(group);
        assert_eq!(sub.len(), 3);
        let names: Vec<_> = sub
            .children(sub.root)
            .into_iter()
            .map(|i| sub.layer(i).name.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }
}
