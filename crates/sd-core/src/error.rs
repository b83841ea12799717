use thiserror::Error;

/// Failure to turn source asset bytes into a layer tree.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("source asset is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("malformed SVG markup: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("root element is <{0}>, expected <svg>")]
    NotSvg(String),
}
