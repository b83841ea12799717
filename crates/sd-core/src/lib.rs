pub mod error;
pub mod factory;
pub mod font;
pub mod id;
pub mod layout;
pub mod model;
pub mod parser;
pub mod properties;
pub mod session;
pub mod sticker;
pub mod walker;

pub use error::SceneError;
pub use factory::{EntityFactory, FactoryConfig, make_sticker};
pub use font::{FontRegistry, ResolvedFont};
pub use id::StickerId;
pub use layout::{LayoutHost, NoopLayout, PersistedGeometry, Viewport, apply_persisted_geometry, fit_to_canvas};
pub use model::*;
pub use parser::parse_svg;
pub use properties::{TextProperties, extract_text_properties};
pub use session::Session;
pub use sticker::*;
pub use walker::{SceneNode, ShapeNode, TextNode, extract, extract_with_fonts, walk};

// Re-export petgraph types so downstream crates don't need a direct dependency
pub use petgraph::graph::NodeIndex;
