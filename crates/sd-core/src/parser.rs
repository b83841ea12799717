//! SVG loader: source asset bytes → `LayerTree`.
//!
//! XML structure comes from `roxmltree`; the attribute micro-syntaxes
//! (numbers, lengths, point lists, transform lists, colors) are parsed with
//! `winnow`. Only the subset of SVG that maps onto editable stickers is
//! honored: groups, basic shapes, paths, images, text, solid and gradient
//! paint, clip/mask references, and transforms. Filters, animations,
//! `<use>` references, and CSS stylesheets are ignored.

use crate::error::SceneError;
use crate::model::*;
use kurbo::{Affine, BezPath, Circle, Ellipse, Point, Rect, RoundedRect, Shape};
use std::collections::HashMap;
use winnow::ascii::{digit0, digit1, multispace0};
use winnow::combinator::{alt, delimited, opt, preceded, repeat, terminated};
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Elements that never paint on their own.
const NON_RENDERED: &[&str] = &[
    "defs",
    "clipPath",
    "mask",
    "linearGradient",
    "radialGradient",
    "pattern",
    "symbol",
    "style",
    "title",
    "desc",
    "metadata",
    "marker",
    "filter",
    "use",
    "script",
];

/// Curve flattening tolerance for circles/ellipses/rounded rects.
const TOLERANCE: f64 = 0.1;

/// Parse SVG source bytes into a layer tree.
#[must_use = "parsing result should be used"]
pub fn parse_svg(bytes: &[u8]) -> Result<LayerTree, SceneError> {
    let text = std::str::from_utf8(bytes)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut options = roxmltree::ParsingOptions::default();
    options.allow_dtd = true;
    let doc = roxmltree::Document::parse_with_options(text, options)?;

    let svg = doc.root_element();
    if svg.tag_name().name() != "svg" {
        return Err(SceneError::NotSvg(svg.tag_name().name().to_string()));
    }

    let ctx = Context {
        gradients: collect_gradients(&doc),
    };
    let style = Presentation::default().inherit(svg);

    let (width, height, transform) = viewport_of(svg);
    let mut root = Layer::container(Rect::new(0.0, 0.0, width, height)).with_transform(transform);
    root.name = svg.attribute("id").map(str::to_string);

    let mut tree = LayerTree::new(root);
    let root_idx = tree.root;
    for child in svg.children().filter(|n| n.is_element()) {
        build_layer(&ctx, &mut tree, root_idx, child, &style);
    }

    log::debug!("parsed SVG into {} layers", tree.len());
    Ok(tree)
}

struct Context {
    gradients: HashMap<String, (GradientKind, GradientStops)>,
}

impl Context {
    fn paint(&self, spec: &PaintSpec, opacity: f64) -> Option<Paint> {
        match spec {
            PaintSpec::None => None,
            PaintSpec::Color(c) => Some(Paint::Solid(c.with_alpha_factor(opacity))),
            PaintSpec::Url(id) => self.gradients.get(id).map(|(kind, stops)| Paint::Gradient {
                kind: *kind,
                stops: stops
                    .iter()
                    .map(|s| GradientStop {
                        offset: s.offset,
                        color: s.color.with_alpha_factor(opacity),
                    })
                    .collect(),
            }),
        }
    }
}

// ─── Presentation attributes ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum PaintSpec {
    None,
    Color(Color),
    Url(String),
}

/// Inherited presentation state while descending the document.
#[derive(Debug, Clone)]
struct Presentation {
    fill: PaintSpec,
    fill_opacity: f64,
    stroke: PaintSpec,
    stroke_opacity: f64,
    stroke_width: f64,
    font_family: Option<String>,
    font_size: f64,
    bold: bool,
    italic: bool,
    text_anchor: Option<String>,
}

impl Default for Presentation {
    fn default() -> Self {
        Self {
            fill: PaintSpec::Color(Color::BLACK),
            fill_opacity: 1.0,
            stroke: PaintSpec::None,
            stroke_opacity: 1.0,
            stroke_width: 1.0,
            font_family: None,
            font_size: 16.0,
            bold: false,
            italic: false,
            text_anchor: None,
        }
    }
}

impl Presentation {
    fn inherit(&self, node: roxmltree::Node<'_, '_>) -> Self {
        let mut next = self.clone();

        if let Some(v) = prop(node, "fill").and_then(parse_paint) {
            next.fill = v;
        }
        if let Some(v) = prop(node, "stroke").and_then(parse_paint) {
            next.stroke = v;
        }
        if let Some(v) = prop(node, "fill-opacity").and_then(parse_number) {
            next.fill_opacity *= v;
        }
        if let Some(v) = prop(node, "stroke-opacity").and_then(parse_number) {
            next.stroke_opacity *= v;
        }
        // Group opacity folded into paint alpha (approximation).
        if let Some(v) = prop(node, "opacity").and_then(parse_number) {
            next.fill_opacity *= v;
            next.stroke_opacity *= v;
        }
        if let Some(v) = prop(node, "stroke-width").and_then(parse_length) {
            next.stroke_width = v;
        }
        if let Some(v) = prop(node, "font-family") {
            next.font_family = first_family(v);
        }
        if let Some(v) = prop(node, "font-size").and_then(parse_length) {
            next.font_size = v;
        }
        if let Some(v) = prop(node, "font-weight") {
            next.bold = match v.trim() {
                "bold" | "bolder" => true,
                "normal" | "lighter" => false,
                w => w.parse::<u16>().map(|n| n >= 600).unwrap_or(next.bold),
            };
        }
        if let Some(v) = prop(node, "font-style") {
            next.italic = matches!(v.trim(), "italic" | "oblique");
        }
        if let Some(v) = prop(node, "text-anchor") {
            next.text_anchor = Some(v.trim().to_string());
        }
        next
    }
}

/// Read a property from the inline `style` attribute, then the attribute.
fn prop<'a>(node: roxmltree::Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attribute("style")
        .and_then(|style| style_property(style, name))
        .or_else(|| node.attribute(name))
}

fn style_property<'a>(style: &'a str, name: &str) -> Option<&'a str> {
    style.split(';').find_map(|decl| {
        let (key, value) = decl.split_once(':')?;
        (key.trim() == name).then(|| value.trim())
    })
}

fn first_family(list: &str) -> Option<String> {
    let first = list.split(',').next()?.trim();
    let unquoted = first.trim_matches(|c| c == '\'' || c == '"').trim();
    (!unquoted.is_empty()).then(|| unquoted.to_string())
}

fn href<'a>(node: roxmltree::Node<'a, '_>) -> Option<&'a str> {
    node.attribute("href")
        .or_else(|| node.attribute((XLINK_NS, "href")))
}

/// `url(#id)` → `id`.
fn url_ref(value: &str) -> Option<&str> {
    let inner = value.trim().strip_prefix("url(")?.strip_suffix(')')?;
    let inner = inner.trim().trim_matches(|c| c == '\'' || c == '"');
    inner.strip_prefix('#')
}

// ─── Layers ─────────────────────────────────────────────────────────────

fn build_layer(
    ctx: &Context,
    tree: &mut LayerTree,
    parent: petgraph::graph::NodeIndex,
    node: roxmltree::Node<'_, '_>,
    inherited: &Presentation,
) {
    let tag = node.tag_name().name();
    if NON_RENDERED.contains(&tag) || prop(node, "display").is_some_and(|d| d.trim() == "none") {
        return;
    }

    let style = inherited.inherit(node);
    let mut transform = node
        .attribute("transform")
        .and_then(parse_transform)
        .unwrap_or(Affine::IDENTITY);

    let mut layer = match tag {
        "g" | "a" | "switch" => Layer::container(Rect::ZERO),
        "svg" => {
            let x = length_attr(node, "x").unwrap_or(0.0);
            let y = length_attr(node, "y").unwrap_or(0.0);
            let (w, h, viewbox) = viewport_of(node);
            transform = transform * Affine::translate((x, y)) * viewbox;
            Layer::container(Rect::new(0.0, 0.0, w, h))
        }
        "rect" | "circle" | "ellipse" | "line" | "polyline" | "polygon" | "path" => {
            let Some(path) = shape_path(node) else {
                return;
            };
            let mut layer = Layer::shape(path);
            layer.fill = ctx.paint(&style.fill, style.fill_opacity);
            layer.stroke = ctx
                .paint(&style.stroke, style.stroke_opacity)
                .filter(|_| style.stroke_width > 0.0)
                .map(|paint| Stroke {
                    paint,
                    width: style.stroke_width,
                });
            // Lines have no interior.
            if tag == "line" || tag == "polyline" {
                layer.fill = None;
            }
            layer
        }
        "image" => {
            let Some(source) = href(node) else {
                return;
            };
            let x = length_attr(node, "x").unwrap_or(0.0);
            let y = length_attr(node, "y").unwrap_or(0.0);
            let w = length_attr(node, "width").unwrap_or(0.0);
            let h = length_attr(node, "height").unwrap_or(0.0);
            Layer::image(Rect::new(x, y, x + w, y + h), ImageContents::Href(source.to_string()))
        }
        "text" => text_layer(node, &style),
        _ => return,
    };

    layer.name = node.attribute("id").map(str::to_string);
    layer.transform = transform;
    layer.mask = prop(node, "clip-path")
        .or_else(|| prop(node, "mask"))
        .and_then(url_ref)
        .map(str::to_string);

    let is_group = layer.path.is_none() && layer.contents.is_none() && layer.text.is_none();
    let idx = tree.add_layer(parent, layer);

    if is_group {
        for child in node.children().filter(|n| n.is_element()) {
            build_layer(ctx, tree, idx, child, &style);
        }
        if tag != "svg" {
            let bounds = union_of_children(tree, idx);
            tree.graph[idx].bounds = bounds;
        }
    }
}

/// Union of the children's bounds, expressed in the parent's layer space.
fn union_of_children(tree: &LayerTree, idx: petgraph::graph::NodeIndex) -> Rect {
    tree.children(idx)
        .into_iter()
        .map(|child| {
            let layer = tree.layer(child);
            layer.transform.transform_rect_bbox(layer.bounds)
        })
        .reduce(|a, b| a.union(b))
        .unwrap_or(Rect::ZERO)
}

/// Size of an `<svg>` viewport and the viewBox → viewport mapping
/// (`xMidYMid meet`).
fn viewport_of(node: roxmltree::Node<'_, '_>) -> (f64, f64, Affine) {
    let viewbox = node
        .attribute("viewBox")
        .and_then(parse_number_list)
        .filter(|v| v.len() == 4 && v[2] > 0.0 && v[3] > 0.0);

    let width = length_attr(node, "width");
    let height = length_attr(node, "height");

    match viewbox {
        Some(vb) => {
            let (vx, vy, vw, vh) = (vb[0], vb[1], vb[2], vb[3]);
            let w = width.unwrap_or(vw);
            let h = height.unwrap_or(vh);
            let scale = (w / vw).min(h / vh);
            let tx = (w - vw * scale) / 2.0 - vx * scale;
            let ty = (h - vh * scale) / 2.0 - vy * scale;
            (w, h, Affine::translate((tx, ty)) * Affine::scale(scale))
        }
        None => (width.unwrap_or(0.0), height.unwrap_or(0.0), Affine::IDENTITY),
    }
}

fn length_attr(node: roxmltree::Node<'_, '_>, name: &str) -> Option<f64> {
    node.attribute(name).and_then(parse_length)
}

fn shape_path(node: roxmltree::Node<'_, '_>) -> Option<BezPath> {
    let len = |name| length_attr(node, name).unwrap_or(0.0);

    let path = match node.tag_name().name() {
        "rect" => {
            let (x, y, w, h) = (len("x"), len("y"), len("width"), len("height"));
            if w <= 0.0 || h <= 0.0 {
                return None;
            }
            let rx = length_attr(node, "rx").or_else(|| length_attr(node, "ry")).unwrap_or(0.0);
            let rect = Rect::new(x, y, x + w, y + h);
            if rx > 0.0 {
                RoundedRect::from_rect(rect, rx.min(w / 2.0).min(h / 2.0)).to_path(TOLERANCE)
            } else {
                rect.to_path(TOLERANCE)
            }
        }
        "circle" => {
            let r = len("r");
            if r <= 0.0 {
                return None;
            }
            Circle::new((len("cx"), len("cy")), r).to_path(TOLERANCE)
        }
        "ellipse" => {
            let (rx, ry) = (len("rx"), len("ry"));
            if rx <= 0.0 || ry <= 0.0 {
                return None;
            }
            Ellipse::new((len("cx"), len("cy")), (rx, ry), 0.0).to_path(TOLERANCE)
        }
        "line" => {
            let mut path = BezPath::new();
            path.move_to((len("x1"), len("y1")));
            path.line_to((len("x2"), len("y2")));
            path
        }
        tag @ ("polyline" | "polygon") => {
            let coords = node.attribute("points").and_then(parse_number_list)?;
            let points: Vec<Point> = coords.chunks_exact(2).map(|c| Point::new(c[0], c[1])).collect();
            if points.len() < 2 {
                return None;
            }
            let mut path = BezPath::new();
            path.move_to(points[0]);
            for p in &points[1..] {
                path.line_to(*p);
            }
            if tag == "polygon" {
                path.close_path();
            }
            path
        }
        "path" => BezPath::from_svg(node.attribute("d")?).ok()?,
        _ => return None,
    };

    (!path.elements().is_empty()).then_some(path)
}

fn text_layer(node: roxmltree::Node<'_, '_>, style: &Presentation) -> Layer {
    let raw: String = node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    let content = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    // Position: the text element's own x/y, else its first positioned tspan.
    let first_tspan = node
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "tspan");
    let coord = |name: &str| {
        node.attribute(name)
            .or_else(|| first_tspan.and_then(|t| t.attribute(name)))
            .and_then(parse_number_list)
            .and_then(|v| v.first().copied())
            .unwrap_or(0.0)
    };
    let (x, y) = (coord("x"), coord("y"));

    let size = style.font_size;
    let width = content.chars().count() as f64 * size * 0.55;
    let height = size * 1.2;
    let left = match style.text_anchor.as_deref() {
        Some("middle") => x - width / 2.0,
        Some("end") => x - width,
        _ => x,
    };
    let top = y - size * 0.9;

    let foreground = match &style.fill {
        PaintSpec::Color(c) => Some(c.with_alpha_factor(style.fill_opacity)),
        _ => None,
    };
    let styled = style.font_family.as_ref().map(|family| TextAttributes {
        font: Some(FontDescriptor {
            name: face_name(family, style.bold, style.italic),
            family: family.clone(),
            size,
            traits: FontTraits {
                bold: style.bold,
                italic: style.italic,
            },
        }),
        foreground,
    });
    let alignment_mode = style.text_anchor.as_deref().map(|anchor| {
        match anchor {
            "middle" => "center",
            "end" => "right",
            "start" => "left",
            other => other,
        }
        .to_string()
    });

    Layer::text(
        Rect::new(left, top, left + width, top + height),
        TextLayer {
            string: content,
            styled,
            font_size: size,
            foreground,
            alignment_mode,
        },
    )
}

/// PostScript-style face name, e.g. `Times New Roman` + bold → `TimesNewRoman-Bold`.
fn face_name(family: &str, bold: bool, italic: bool) -> String {
    let base: String = family.chars().filter(|c| !c.is_whitespace()).collect();
    match (bold, italic) {
        (true, true) => format!("{base}-BoldItalic"),
        (true, false) => format!("{base}-Bold"),
        (false, true) => format!("{base}-Italic"),
        (false, false) => base,
    }
}

// ─── Gradients ──────────────────────────────────────────────────────────

fn collect_gradients(doc: &roxmltree::Document<'_>) -> HashMap<String, (GradientKind, GradientStops)> {
    let mut own: HashMap<String, (GradientKind, GradientStops, Option<String>)> = HashMap::new();
    for node in doc.descendants().filter(|n| n.is_element()) {
        let kind = match node.tag_name().name() {
            "linearGradient" => GradientKind::Linear,
            "radialGradient" => GradientKind::Radial,
            _ => continue,
        };
        let Some(id) = node.attribute("id") else {
            continue;
        };
        let stops: GradientStops = node
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "stop")
            .map(gradient_stop)
            .collect();
        let parent = href(node).and_then(|h| h.strip_prefix('#')).map(str::to_string);
        own.insert(id.to_string(), (kind, stops, parent));
    }

    // Gradients without stops borrow them from the gradient they reference.
    own.iter()
        .map(|(id, (kind, stops, parent))| {
            let stops = if stops.is_empty() {
                parent
                    .as_ref()
                    .and_then(|p| own.get(p))
                    .map(|(_, s, _)| s.clone())
                    .unwrap_or_default()
            } else {
                stops.clone()
            };
            (id.clone(), (*kind, stops))
        })
        .collect()
}

fn gradient_stop(node: roxmltree::Node<'_, '_>) -> GradientStop {
    let offset = node
        .attribute("offset")
        .and_then(|v| match v.trim().strip_suffix('%') {
            Some(pct) => parse_number(pct).map(|p| p / 100.0),
            None => parse_number(v),
        })
        .unwrap_or(0.0)
        .clamp(0.0, 1.0) as f32;
    let color = match prop(node, "stop-color").and_then(parse_paint) {
        Some(PaintSpec::Color(c)) => c,
        _ => Color::BLACK,
    };
    let opacity = prop(node, "stop-opacity").and_then(parse_number).unwrap_or(1.0);
    GradientStop {
        offset,
        color: color.with_alpha_factor(opacity),
    }
}

// ─── Micro-syntax parsers ───────────────────────────────────────────────

fn separators<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(0.., |c: char| c.is_whitespace() || c == ',').parse_next(input)
}

fn number_text<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    (
        opt(one_of(['+', '-'])),
        alt(((digit1, opt(('.', digit0))).void(), ('.', digit1).void())),
        opt((one_of(['e', 'E']), opt(one_of(['+', '-'])), digit1)),
    )
        .take()
        .parse_next(input)
}

fn number(input: &mut &str) -> ModalResult<f64> {
    number_text.try_map(str::parse::<f64>).parse_next(input)
}

fn number_list(input: &mut &str) -> ModalResult<Vec<f64>> {
    terminated(repeat(0.., preceded(separators, number)), separators).parse_next(input)
}

fn transform_fn(input: &mut &str) -> ModalResult<Affine> {
    (
        take_while(1.., |c: char| c.is_ascii_alphabetic()),
        preceded(multispace0, delimited('(', number_list, ')')),
    )
        .verify_map(|(name, args): (&str, Vec<f64>)| transform_from_args(name, &args))
        .parse_next(input)
}

fn transform_list(input: &mut &str) -> ModalResult<Vec<Affine>> {
    terminated(repeat(0.., preceded(separators, transform_fn)), separators).parse_next(input)
}

fn transform_from_args(name: &str, args: &[f64]) -> Option<Affine> {
    match (name, args) {
        ("matrix", &[a, b, c, d, e, f]) => Some(Affine::new([a, b, c, d, e, f])),
        ("translate", &[x]) => Some(Affine::translate((x, 0.0))),
        ("translate", &[x, y]) => Some(Affine::translate((x, y))),
        ("scale", &[s]) => Some(Affine::scale(s)),
        ("scale", &[sx, sy]) => Some(Affine::scale_non_uniform(sx, sy)),
        ("rotate", &[a]) => Some(Affine::rotate(a.to_radians())),
        ("rotate", &[a, cx, cy]) => Some(
            Affine::translate((cx, cy)) * Affine::rotate(a.to_radians()) * Affine::translate((-cx, -cy)),
        ),
        ("skewX", &[a]) => Some(Affine::new([1.0, 0.0, a.to_radians().tan(), 1.0, 0.0, 0.0])),
        ("skewY", &[a]) => Some(Affine::new([1.0, a.to_radians().tan(), 0.0, 1.0, 0.0, 0.0])),
        _ => None,
    }
}

/// Parse a single number, ignoring surrounding whitespace.
pub fn parse_number(input: &str) -> Option<f64> {
    let mut rest = input.trim();
    let value = number.parse_next(&mut rest).ok()?;
    rest.is_empty().then_some(value)
}

/// Parse a whitespace/comma separated number list.
pub fn parse_number_list(input: &str) -> Option<Vec<f64>> {
    let mut rest = input;
    let values = number_list.parse_next(&mut rest).ok()?;
    rest.is_empty().then_some(values)
}

/// Parse an absolute length in user units. Percentages are unsupported.
pub fn parse_length(input: &str) -> Option<f64> {
    let mut rest = input.trim();
    let value = number.parse_next(&mut rest).ok()?;
    let factor = match rest.trim() {
        "" | "px" => 1.0,
        "pt" => 4.0 / 3.0,
        "pc" => 16.0,
        "mm" => 96.0 / 25.4,
        "cm" => 96.0 / 2.54,
        "in" => 96.0,
        "em" => 16.0,
        _ => return None,
    };
    Some(value * factor)
}

/// Parse an SVG transform list, composing left to right.
pub fn parse_transform(input: &str) -> Option<Affine> {
    let mut rest = input;
    let list = transform_list.parse_next(&mut rest).ok()?;
    if !rest.is_empty() {
        return None;
    }
    Some(list.into_iter().fold(Affine::IDENTITY, |acc, t| acc * t))
}

fn parse_paint(value: &str) -> Option<PaintSpec> {
    let value = value.trim();
    if let Some(id) = url_ref(value) {
        return Some(PaintSpec::Url(id.to_string()));
    }
    match value {
        "none" | "transparent" => return Some(PaintSpec::None),
        "currentColor" | "inherit" => return None,
        _ => {}
    }
    parse_color(value).map(PaintSpec::Color)
}

/// `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb()`/`rgba()`, or a basic named color.
pub fn parse_color(value: &str) -> Option<Color> {
    let value = value.trim();
    if value.starts_with('#') {
        return Color::from_hex(value);
    }
    if let Some(args) = value
        .strip_prefix("rgba(")
        .or_else(|| value.strip_prefix("rgb("))
        .and_then(|s| s.strip_suffix(')'))
    {
        let channel = |s: &str| -> Option<u8> {
            let s = s.trim();
            let v = match s.strip_suffix('%') {
                Some(pct) => parse_number(pct)? * 2.55,
                None => parse_number(s)?,
            };
            Some(v.round().clamp(0.0, 255.0) as u8)
        };
        let parts: Vec<&str> = args.split(',').collect();
        return match parts.as_slice() {
            [r, g, b] => Some(Color::rgb(channel(r)?, channel(g)?, channel(b)?)),
            [r, g, b, a] => {
                let alpha = parse_number(a)?.clamp(0.0, 1.0);
                Some(Color::rgb(channel(r)?, channel(g)?, channel(b)?).with_alpha_factor(alpha))
            }
            _ => None,
        };
    }
    let named = match value.to_ascii_lowercase().as_str() {
        "black" => Color::BLACK,
        "white" => Color::WHITE,
        "red" => Color::rgb(255, 0, 0),
        "green" => Color::rgb(0, 128, 0),
        "lime" => Color::rgb(0, 255, 0),
        "blue" => Color::rgb(0, 0, 255),
        "yellow" => Color::rgb(255, 255, 0),
        "orange" => Color::rgb(255, 165, 0),
        "purple" => Color::rgb(128, 0, 128),
        "gray" | "grey" => Color::rgb(128, 128, 128),
        "silver" => Color::rgb(192, 192, 192),
        "navy" => Color::rgb(0, 0, 128),
        "teal" => Color::rgb(0, 128, 128),
        "maroon" => Color::rgb(128, 0, 0),
        "pink" => Color::rgb(255, 192, 203),
        _ => return None,
    };
    Some(named)
}
