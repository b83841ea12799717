//! Font availability snapshot and substitution.
//!
//! The registry is an immutable set of family and face names. The global
//! instance is built lazily from the system font database on first use and
//! never changes afterwards, so lookups need no synchronization.

use std::collections::HashSet;
use std::sync::LazyLock;

static SYSTEM: LazyLock<FontRegistry> = LazyLock::new(FontRegistry::from_system);

/// Outcome of resolving a requested font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedFont {
    /// An available face or family name.
    Named(String),
    /// Nothing usable; the caller should render with its default font.
    UseDefault,
}

impl ResolvedFont {
    pub fn into_option(self) -> Option<String> {
        match self {
            ResolvedFont::Named(name) => Some(name),
            ResolvedFont::UseDefault => None,
        }
    }
}

/// Keyword rules for mapping unknown families onto common system families.
/// First match wins; `exclude` vetoes a rule when present in the name.
struct Substitution {
    keywords: &'static [&'static str],
    exclude: Option<&'static str>,
    family: &'static str,
}

const SUBSTITUTIONS: &[Substitution] = &[
    Substitution { keywords: &["serif"], exclude: Some("sans"), family: "Georgia" },
    Substitution { keywords: &["times"], exclude: None, family: "Times New Roman" },
    Substitution { keywords: &["georgia"], exclude: None, family: "Georgia" },
    Substitution { keywords: &["arial", "helvetica"], exclude: None, family: "Helvetica Neue" },
    Substitution { keywords: &["sans"], exclude: None, family: "Helvetica Neue" },
    Substitution { keywords: &["mono", "courier"], exclude: None, family: "Courier New" },
    Substitution { keywords: &["script", "cursive"], exclude: None, family: "Snell Roundhand" },
];

/// Read-only snapshot of available font families and face names.
#[derive(Debug, Clone, Default)]
pub struct FontRegistry {
    families: HashSet<String>,
    names: HashSet<String>,
}

impl FontRegistry {
    /// The process-wide snapshot of system fonts.
    pub fn global() -> &'static FontRegistry {
        &SYSTEM
    }

    /// Build a snapshot from explicit family and face names.
    pub fn from_parts<F, N>(families: F, names: N) -> Self
    where
        F: IntoIterator,
        F::Item: Into<String>,
        N: IntoIterator,
        N::Item: Into<String>,
    {
        Self {
            families: families.into_iter().map(Into::into).collect(),
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Scan the system font directories once.
    pub fn from_system() -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();

        let mut registry = FontRegistry::default();
        for face in db.faces() {
            for (family, _language) in &face.families {
                registry.families.insert(family.clone());
            }
            if !face.post_script_name.is_empty() {
                registry.names.insert(face.post_script_name.clone());
            }
        }
        log::debug!(
            "font registry: {} families, {} faces",
            registry.families.len(),
            registry.names.len()
        );
        registry
    }

    pub fn has_family(&self, family: &str) -> bool {
        self.families.contains(family)
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Resolve a face name / family pair to something renderable.
    ///
    /// Order: private fonts (leading `.`) → default; exact face name; family
    /// name; keyword substitution (only if the substitute is available);
    /// otherwise default.
    pub fn resolve(&self, name: &str, family: &str) -> ResolvedFont {
        if name.starts_with('.') || family.starts_with('.') {
            return ResolvedFont::UseDefault;
        }
        if self.has_name(name) {
            return ResolvedFont::Named(name.to_string());
        }
        if self.has_family(family) {
            return ResolvedFont::Named(family.to_string());
        }
        match substitute_family(family) {
            Some(mapped) if self.has_family(mapped) => ResolvedFont::Named(mapped.to_string()),
            _ => ResolvedFont::UseDefault,
        }
    }
}

/// Map a free-form family name onto a common system family.
pub fn substitute_family(family: &str) -> Option<&'static str> {
    let lowered = family.to_lowercase();
    SUBSTITUTIONS
        .iter()
        .find(|rule| {
            rule.keywords.iter().any(|k| lowered.contains(k))
                && rule.exclude.is_none_or(|ex| !lowered.contains(ex))
        })
        .map(|rule| rule.family)
}
