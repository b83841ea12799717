//! On-disk draft packages.
//!
//! Layout, one directory per draft id under the store root:
//!
//! ```text
//! <id>/
//!   draft.json
//!   thumbnail.png
//!   <svgName>.svg
//!   images/
//!     userImage_<zIndex>.png
//! ```
//!
//! A save writes a complete package into a dot-prefixed staging directory
//! and swaps it in with renames, so readers see either the old package or
//! the new one. Listing ignores dot-prefixed directories. There is no
//! per-id locking: concurrent saves or deletes of one id are
//! last-writer-wins.

use crate::codec::{self, SkippedRecord};
use crate::error::DraftError;
use crate::record::DraftDocument;
use chrono::Utc;
use sd_core::{EntityFactory, FontRegistry, LayoutHost, Sticker, extract_with_fonts};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "draft.json";
pub const THUMBNAIL_FILE: &str = "thumbnail.png";
pub const IMAGES_DIR: &str = "images";
pub const SOURCE_EXTENSION: &str = "svg";

/// Supplies source asset bytes by name.
pub trait AssetProvider {
    fn bytes_for(&self, name: &str) -> Option<Vec<u8>>;
}

/// Reads `<dir>/<name>.svg`.
#[derive(Debug, Clone)]
pub struct DirAssetProvider {
    dir: PathBuf,
}

impl DirAssetProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl AssetProvider for DirAssetProvider {
    fn bytes_for(&self, name: &str) -> Option<Vec<u8>> {
        if !is_safe_segment(name) {
            return None;
        }
        let path = self.dir.join(format!("{name}.{SOURCE_EXTENSION}"));
        fs::read(&path)
            .inspect_err(|err| log::debug!("asset {name:?} unavailable at {path:?}: {err}"))
            .ok()
    }
}

impl AssetProvider for HashMap<String, Vec<u8>> {
    fn bytes_for(&self, name: &str) -> Option<Vec<u8>> {
        self.get(name).cloned()
    }
}

/// No source assets at all; saves keep whatever copy a package already has.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAssets;

impl AssetProvider for NoAssets {
    fn bytes_for(&self, _name: &str) -> Option<Vec<u8>> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub root: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("drafts"),
        }
    }
}

/// Outcome of a restore.
#[derive(Debug, Clone)]
pub struct Restored {
    pub document: DraftDocument,
    /// In persisted paint order.
    pub stickers: Vec<Sticker>,
    pub skipped: Vec<SkippedRecord>,
}

impl Restored {
    /// Some records could not be rebuilt.
    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }
}

#[derive(Debug)]
pub struct DraftStore<A = DirAssetProvider> {
    root: PathBuf,
    assets: A,
}

impl<A: AssetProvider> DraftStore<A> {
    /// Open a store, creating its root directory if missing.
    pub fn open(config: StoreConfig, assets: A) -> Result<Self, DraftError> {
        fs::create_dir_all(&config.root).map_err(|e| DraftError::io(&config.root, e))?;
        Ok(Self {
            root: config.root,
            assets,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn package_dir(&self, id: &str) -> Result<PathBuf, DraftError> {
        validate_id(id)?;
        Ok(self.root.join(id))
    }

    pub fn source_asset_path(&self, id: &str, svg_name: &str) -> Result<PathBuf, DraftError> {
        Ok(self.package_dir(id)?.join(format!("{svg_name}.{SOURCE_EXTENSION}")))
    }

    // ─── Save ────────────────────────────────────────────────────────────

    /// Persist `stickers` as a package; returns the draft id.
    ///
    /// With `existing_id` the previous package is replaced wholesale and its
    /// `created_at` carried over. Without one a new uuid id is minted.
    pub fn save(
        &self,
        stickers: &[Sticker],
        svg_name: &str,
        thumbnail: Option<&[u8]>,
        existing_id: Option<&str>,
    ) -> Result<String, DraftError> {
        let id = match existing_id {
            Some(id) => id.to_string(),
            None => uuid::Uuid::new_v4().to_string(),
        };
        let target = self.package_dir(&id)?;
        if !is_safe_segment(svg_name) {
            return Err(DraftError::InvalidAssetName(svg_name.to_string()));
        }

        let now = Utc::now();
        let created_at = match self.load(&id) {
            Ok(previous) => previous.created_at,
            Err(DraftError::NotFound(_)) => now,
            Err(err) => {
                log::warn!("draft {id}: previous manifest unreadable, resetting createdAt: {err}");
                now
            }
        };

        let encoded = codec::encode(stickers);
        let doc = DraftDocument {
            id: id.clone(),
            svg_name: svg_name.to_string(),
            created_at,
            updated_at: now,
            stickers: encoded.records,
        };

        let staging = self.root.join(format!(".staging-{id}-{}", uuid::Uuid::new_v4()));
        let written = self.write_package(&staging, &target, &doc, &encoded.images, thumbnail);
        let result = written.and_then(|()| swap_into_place(&staging, &target));
        if result.is_err() && staging.exists() {
            if let Err(e) = fs::remove_dir_all(&staging) {
                log::warn!("leftover staging copy at {staging:?}: {e}");
            }
        }
        result?;

        log::debug!("saved draft {id} with {} stickers", doc.stickers.len());
        Ok(id)
    }

    fn write_package(
        &self,
        dir: &Path,
        previous: &Path,
        doc: &DraftDocument,
        images: &[codec::RasterFile],
        thumbnail: Option<&[u8]>,
    ) -> Result<(), DraftError> {
        let images_dir = dir.join(IMAGES_DIR);
        fs::create_dir_all(&images_dir).map_err(|e| DraftError::io(&images_dir, e))?;

        let json = codec::manifest_json(doc).map_err(|e| DraftError::io(dir.join(MANIFEST_FILE), io::Error::other(e)))?;
        write_file(&dir.join(MANIFEST_FILE), json.as_bytes())?;

        if let Some(png) = thumbnail {
            write_file(&dir.join(THUMBNAIL_FILE), png)?;
        }

        for image in images {
            write_file(&images_dir.join(&image.file_name), &image.bytes)?;
        }

        let source_name = format!("{}.{SOURCE_EXTENSION}", doc.svg_name);
        let source = self
            .assets
            .bytes_for(&doc.svg_name)
            .or_else(|| fs::read(previous.join(&source_name)).ok());
        match source {
            Some(bytes) => write_file(&dir.join(&source_name), &bytes)?,
            None => log::warn!("draft {}: source asset {:?} not found, package has no copy", doc.id, doc.svg_name),
        }
        Ok(())
    }

    // ─── Read ────────────────────────────────────────────────────────────

    pub fn load(&self, id: &str) -> Result<DraftDocument, DraftError> {
        let path = self.package_dir(id)?.join(MANIFEST_FILE);
        let bytes = fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => DraftError::NotFound(id.to_string()),
            _ => DraftError::io(&path, e),
        })?;
        codec::decode_manifest(&bytes, &path)
    }

    /// All decodable drafts, most recently updated first.
    pub fn list(&self) -> Result<Vec<DraftDocument>, DraftError> {
        let entries = fs::read_dir(&self.root).map_err(|e| DraftError::io(&self.root, e))?;
        let mut docs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DraftError::io(&self.root, e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with('.') || !entry.path().is_dir() {
                continue;
            }
            match self.load(name) {
                Ok(doc) => docs.push(doc),
                Err(err) => log::warn!("skipping draft directory {name:?}: {err}"),
            }
        }
        docs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(docs)
    }

    pub fn delete(&self, id: &str) -> Result<(), DraftError> {
        let dir = self.package_dir(id)?;
        fs::remove_dir_all(&dir).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => DraftError::NotFound(id.to_string()),
            _ => DraftError::io(&dir, e),
        })?;
        log::debug!("deleted draft {id}");
        Ok(())
    }

    /// Preview image bytes, if the package has one.
    pub fn thumbnail(&self, id: &str) -> Result<Option<Vec<u8>>, DraftError> {
        read_optional(&self.package_dir(id)?.join(THUMBNAIL_FILE))
    }

    /// Raster bytes of a user image in the package.
    pub fn user_image(&self, id: &str, file_name: &str) -> Result<Option<Vec<u8>>, DraftError> {
        if !is_safe_segment(file_name) {
            return Ok(None);
        }
        read_optional(&self.package_dir(id)?.join(IMAGES_DIR).join(file_name))
    }

    // ─── Restore ─────────────────────────────────────────────────────────

    /// Rebuild a draft's stickers against the system font snapshot.
    pub fn restore(&self, id: &str, host: &mut dyn LayoutHost) -> Result<Restored, DraftError> {
        self.restore_with(id, &EntityFactory::default(), FontRegistry::global(), host)
    }

    pub fn restore_with(
        &self,
        id: &str,
        factory: &EntityFactory,
        fonts: &FontRegistry,
        host: &mut dyn LayoutHost,
    ) -> Result<Restored, DraftError> {
        let document = self.load(id)?;

        let source_path = self.source_asset_path(id, &document.svg_name)?;
        let source = fs::read(&source_path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => DraftError::AssetNotFound {
                name: document.svg_name.clone(),
            },
            _ => DraftError::io(&source_path, e),
        })?;
        let nodes = extract_with_fonts(&source, fonts)?;

        let raster = |name: &str| self.user_image(id, name).ok().flatten();
        let (stickers, skipped) = codec::reconstruct(&document, &nodes, &raster, factory, host);

        if !skipped.is_empty() {
            log::warn!(
                "draft {id}: restored {} of {} stickers",
                stickers.len(),
                document.stickers.len()
            );
        }
        Ok(Restored {
            document,
            stickers,
            skipped,
        })
    }
}

/// Rename `staging` to `target`, moving any previous package out of the way
/// first and back again if the swap fails.
fn swap_into_place(staging: &Path, target: &Path) -> Result<(), DraftError> {
    if !target.exists() {
        return fs::rename(staging, target).map_err(|e| DraftError::io(target, e));
    }

    let parent = target.parent().unwrap_or(Path::new("."));
    let name = target.file_name().and_then(|n| n.to_str()).unwrap_or("draft");
    let trash = parent.join(format!(".trash-{name}-{}", uuid::Uuid::new_v4()));

    fs::rename(target, &trash).map_err(|e| DraftError::io(target, e))?;
    if let Err(e) = fs::rename(staging, target) {
        if let Err(restore) = fs::rename(&trash, target) {
            log::warn!("could not put previous package back at {target:?}: {restore}");
        }
        return Err(DraftError::io(target, e));
    }
    if let Err(e) = fs::remove_dir_all(&trash) {
        log::warn!("leftover package copy at {trash:?}: {e}");
    }
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), DraftError> {
    fs::write(path, bytes).map_err(|e| DraftError::io(path, e))
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, DraftError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(DraftError::io(path, e)),
    }
}

fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment.len() <= 255
        && !segment.starts_with('.')
        && !segment
            .chars()
            .any(|c| matches!(c, '/' | '\\' | ':' | '\0') || c.is_control())
}

fn validate_id(id: &str) -> Result<(), DraftError> {
    if is_safe_segment(id) {
        Ok(())
    } else {
        Err(DraftError::InvalidId(id.to_string()))
    }
}
