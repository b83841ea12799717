//! Integration tests: save → package → restore (sd-draft ↔ sd-core).
//!
//! Drives the DraftStore against a temporary root, checking that sessions
//! come back with identical geometry and that damaged or stale packages
//! degrade the way callers expect.

use kurbo::{Affine, Point, Rect};
use pretty_assertions::assert_eq;
use sd_core::*;
use sd_draft::*;
use std::collections::HashMap;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

/// Eight filled squares in a row: extraction yields shape nodes 0..=7.
const POSTER: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="800" height="100">
  <rect x="0" y="0" width="80" height="80" fill="#FF0000"/>
  <rect x="100" y="0" width="80" height="80" fill="#FF8800"/>
  <rect x="200" y="0" width="80" height="80" fill="#FFFF00"/>
  <rect x="300" y="0" width="80" height="80" fill="#00FF00"/>
  <rect x="400" y="0" width="80" height="80" fill="#00FFFF"/>
  <g transform="translate(500 0)"><rect width="80" height="80" fill="#0000FF"/></g>
  <rect x="600" y="0" width="80" height="80" fill="#8800FF"/>
  <rect x="700" y="0" width="80" height="80" fill="#FF00FF"/>
</svg>"##;

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 1, 2, 3];

fn fonts() -> FontRegistry {
    FontRegistry::default()
}

fn assets() -> HashMap<String, Vec<u8>> {
    HashMap::from([("poster".to_string(), POSTER.as_bytes().to_vec())])
}

fn open(dir: &TempDir) -> DraftStore<HashMap<String, Vec<u8>>> {
    DraftStore::open(
        StoreConfig {
            root: dir.path().to_path_buf(),
        },
        assets(),
    )
    .unwrap()
}

fn restore(store: &DraftStore<HashMap<String, Vec<u8>>>, id: &str) -> Result<Restored, DraftError> {
    store.restore_with(id, &EntityFactory::default(), &fonts(), &mut NoopLayout)
}

fn shape_sticker(node_index: usize) -> Sticker {
    let nodes = extract_with_fonts(POSTER.as_bytes(), &fonts()).unwrap();
    let mut sticker = make_sticker(&nodes[node_index]);
    sticker.center = Point::new(321.5, 210.25);
    sticker.transform = Affine::rotate(0.3) * Affine::scale(1.5);
    if let StickerKind::SvgShape(shape) = &mut sticker.kind {
        shape.opacity = 0.75;
        shape.tint = Some(Tint::Solid(Color::rgb(0x12, 0x34, 0x56)));
    }
    sticker
}

fn image_sticker() -> Sticker {
    let mut image = UserImage::new(PNG.to_vec());
    image.alpha = 0.9;
    image.template_mode = true;
    image.tint = Some(Color::rgb(0, 128, 0));
    let mut sticker = Sticker::new(
        StickerKind::UserImage(image),
        Rect::new(0.0, 0.0, 120.0, 90.0),
        Point::new(60.0, 45.0),
    );
    sticker.locked = true;
    sticker
}

fn text_sticker() -> Sticker {
    let text = SvgText {
        text: "Grand Opening".into(),
        font_name: Some("Georgia".into()),
        font_size: 28.0,
        text_color: Color::rgba(10, 20, 30, 200),
        alignment: TextAlign::Left,
        bold: true,
        italic: true,
        stroke: TextStroke {
            enabled: true,
            color: Color::WHITE,
            width: 2.0,
        },
        shadow: TextShadow::default(),
        text_opacity: 0.8,
    };
    let mut sticker = Sticker::new(
        StickerKind::SvgText(text),
        Rect::new(0.0, 0.0, 240.0, 50.0),
        Point::new(400.0, 300.0),
    );
    sticker.hidden = true;
    sticker.transform = Affine::new([0.9, 0.1, -0.1, 0.9, 0.0, 0.0]);
    sticker
}

fn types(stickers: &[Sticker]) -> Vec<StickerType> {
    stickers.iter().map(Sticker::sticker_type).collect()
}

// ─── Round trip ─────────────────────────────────────────────────────────

#[test]
fn image_text_shape_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    let session = vec![image_sticker(), text_sticker(), shape_sticker(5)];

    let id = store.save(&session, "poster", Some(PNG), None).unwrap();
    let restored = restore(&store, &id).unwrap();

    assert!(!restored.is_partial());
    assert_eq!(
        types(&restored.stickers),
        vec![StickerType::UserImage, StickerType::SvgText, StickerType::SvgShape]
    );
    for (before, after) in session.iter().zip(&restored.stickers) {
        assert_eq!(PersistedGeometry::of(after), PersistedGeometry::of(before));
        assert_eq!(after.locked, before.locked);
        assert_eq!(after.hidden, before.hidden);
    }
    assert_eq!(restored.stickers[2].original_node_index(), Some(5));

    match (&session[1].kind, &restored.stickers[1].kind) {
        (StickerKind::SvgText(a), StickerKind::SvgText(b)) => assert_eq!(a, b),
        other => panic!("unexpected kinds {other:?}"),
    }
    match &restored.stickers[0].kind {
        StickerKind::UserImage(image) => {
            assert_eq!(&*image.image, PNG);
            assert_eq!(image.tint, Some(Color::rgb(0, 128, 0)));
            assert_eq!(image.alpha, 0.9);
        }
        other => panic!("expected user image, got {other:?}"),
    }
    match &restored.stickers[2].kind {
        StickerKind::SvgShape(shape) => {
            assert_eq!(shape.opacity, 0.75);
            assert_eq!(shape.tint, Some(Tint::Solid(Color::rgb(0x12, 0x34, 0x56))));
        }
        other => panic!("expected shape, got {other:?}"),
    }
}

#[test]
fn geometry_survives_bit_for_bit() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    let mut sticker = text_sticker();
    sticker.hidden = false;
    sticker.center = Point::new(255.03058431987478, 0.1 + 0.2);
    sticker.bounds = Rect::new(0.0, 0.0, 1.0 / 3.0, 2.0f64.sqrt());
    sticker.transform = Affine::rotate(0.7) * Affine::scale(1.1);

    let id = store.save(std::slice::from_ref(&sticker), "poster", None, None).unwrap();
    let restored = restore(&store, &id).unwrap();
    let after = &restored.stickers[0];

    assert_eq!(after.center.x.to_bits(), 255.03058431987478f64.to_bits());
    assert_eq!(after.center.y.to_bits(), (0.1f64 + 0.2).to_bits());
    assert_eq!(after.bounds.width().to_bits(), (1.0f64 / 3.0).to_bits());
    assert_eq!(after.bounds.height().to_bits(), 2.0f64.sqrt().to_bits());
    let bits = |t: Affine| t.as_coeffs().map(f64::to_bits);
    assert_eq!(bits(after.transform), bits(sticker.transform));
}

#[test]
fn package_layout_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    let id = store
        .save(&[text_sticker(), image_sticker()], "poster", Some(PNG), None)
        .unwrap();

    let package = dir.path().join(&id);
    assert!(package.join("draft.json").is_file());
    assert!(package.join("poster.svg").is_file());
    assert_eq!(fs::read(package.join("thumbnail.png")).unwrap(), PNG);
    assert_eq!(fs::read(package.join("images").join("userImage_1.png")).unwrap(), PNG);
    assert_eq!(store.thumbnail(&id).unwrap().as_deref(), Some(PNG));
    assert_eq!(store.source_asset_path(&id, "poster").unwrap(), package.join("poster.svg"));

    let manifest: serde_json::Value = serde_json::from_slice(&fs::read(package.join("draft.json")).unwrap()).unwrap();
    assert_eq!(manifest["svgName"], "poster");
    assert_eq!(manifest["stickers"][0]["type"], "svgText");
    assert_eq!(manifest["stickers"][1]["vcImage"]["imageFileName"], "userImage_1.png");
    assert!(manifest["stickers"][1].get("svgText").is_none());
}

#[test]
fn saving_twice_changes_only_updated_at() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    let session = vec![text_sticker(), shape_sticker(2)];

    let id = store.save(&session, "poster", None, None).unwrap();
    let first = store.load(&id).unwrap();
    std::thread::sleep(Duration::from_millis(5));
    let same = store.save(&session, "poster", None, Some(&id)).unwrap();
    let second = store.load(&id).unwrap();

    assert_eq!(same, id);
    assert_eq!(second.created_at, first.created_at);
    assert!(second.updated_at > first.updated_at);
    assert_eq!(
        DraftDocument {
            updated_at: first.updated_at,
            ..second
        },
        first
    );
}

#[test]
fn resave_replaces_previous_package() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    let id = store
        .save(&[image_sticker(), image_sticker()], "poster", None, None)
        .unwrap();
    store.save(&[text_sticker()], "poster", None, Some(&id)).unwrap();

    let package = dir.path().join(&id);
    assert!(!package.join("images").join("userImage_0.png").exists());
    assert_eq!(store.load(&id).unwrap().stickers.len(), 1);

    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with('.'))
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
}

// ─── Partial and failed restores ────────────────────────────────────────

#[test]
fn stale_node_index_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    let mut stale = shape_sticker(1);
    if let StickerKind::SvgShape(shape) = &mut stale.kind {
        shape.original_node_index = 12;
    }
    let id = store
        .save(&[text_sticker(), stale, shape_sticker(7)], "poster", None, None)
        .unwrap();

    let restored = restore(&store, &id).unwrap();
    assert!(restored.is_partial());
    assert_eq!(types(&restored.stickers), vec![StickerType::SvgText, StickerType::SvgShape]);
    assert_eq!(restored.stickers[1].original_node_index(), Some(7));
    assert_eq!(restored.skipped.len(), 1);
    assert_eq!(
        restored.skipped[0].reason,
        SkipReason::StaleNodeReference {
            node_index: 12,
            node_count: 8
        }
    );
}

#[test]
fn missing_raster_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    let id = store
        .save(&[image_sticker(), text_sticker()], "poster", None, None)
        .unwrap();
    fs::remove_file(dir.path().join(&id).join("images").join("userImage_0.png")).unwrap();

    let restored = restore(&store, &id).unwrap();
    assert_eq!(types(&restored.stickers), vec![StickerType::SvgText]);
    assert_eq!(
        restored.skipped[0].reason,
        SkipReason::MissingRasterAsset {
            file: "userImage_0.png".into()
        }
    );
}

#[test]
fn malformed_manifest_fails_and_is_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    let id = store.save(&[text_sticker()], "poster", None, None).unwrap();
    let manifest = dir.path().join(&id).join("draft.json");
    fs::write(&manifest, b"{ not json").unwrap();

    assert!(matches!(restore(&store, &id), Err(DraftError::MalformedDocument { .. })));
    assert_eq!(fs::read(&manifest).unwrap(), b"{ not json");
    assert_eq!(store.list().unwrap(), vec![]);
}

#[test]
fn missing_source_asset_is_fatal_on_restore() {
    let dir = tempfile::tempdir().unwrap();
    let store = DraftStore::open(
        StoreConfig {
            root: dir.path().to_path_buf(),
        },
        NoAssets,
    )
    .unwrap();
    let id = store.save(&[text_sticker()], "poster", None, None).unwrap();

    let err = store
        .restore_with(&id, &EntityFactory::default(), &fonts(), &mut NoopLayout)
        .unwrap_err();
    assert!(matches!(err, DraftError::AssetNotFound { ref name } if name == "poster"));
}

#[test]
fn resave_keeps_package_copy_of_source() {
    let dir = tempfile::tempdir().unwrap();
    let id = open(&dir).save(&[shape_sticker(3)], "poster", None, None).unwrap();

    // A store that can no longer see the asset still carries the old copy.
    let blind = DraftStore::open(
        StoreConfig {
            root: dir.path().to_path_buf(),
        },
        NoAssets,
    )
    .unwrap();
    blind.save(&[shape_sticker(3)], "poster", None, Some(&id)).unwrap();
    let restored = blind
        .restore_with(&id, &EntityFactory::default(), &fonts(), &mut NoopLayout)
        .unwrap();
    assert_eq!(restored.stickers.len(), 1);
}

#[test]
fn corrupt_source_asset_is_a_scene_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    let id = store.save(&[text_sticker()], "poster", None, None).unwrap();
    fs::write(dir.path().join(&id).join("poster.svg"), b"<svg").unwrap();
    assert!(matches!(restore(&store, &id), Err(DraftError::Scene(_))));
}

// ─── Management ─────────────────────────────────────────────────────────

#[test]
fn list_is_newest_first_and_ignores_staging() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    let a = store.save(&[text_sticker()], "poster", None, None).unwrap();
    std::thread::sleep(Duration::from_millis(5));
    let b = store.save(&[text_sticker()], "poster", None, None).unwrap();
    std::thread::sleep(Duration::from_millis(5));
    store.save(&[text_sticker()], "poster", None, Some(&a)).unwrap();

    let staging = dir.path().join(".staging-leftover");
    fs::create_dir_all(&staging).unwrap();
    fs::copy(dir.path().join(&b).join("draft.json"), staging.join("draft.json")).unwrap();

    let ids: Vec<_> = store.list().unwrap().into_iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![a, b]);
}

#[test]
fn delete_removes_package() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    let id = store.save(&[text_sticker()], "poster", None, None).unwrap();

    store.delete(&id).unwrap();
    assert!(!dir.path().join(&id).exists());
    assert!(matches!(store.load(&id), Err(DraftError::NotFound(_))));
    assert!(matches!(store.delete(&id), Err(DraftError::NotFound(_))));
}

#[test]
fn imported_session_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    let session =
        Session::import_with_fonts(POSTER.as_bytes(), Viewport::default(), &EntityFactory::default(), &fonts())
            .unwrap();

    let id = store.save(session.stickers(), "poster", None, None).unwrap();
    let restored = Session::from_stickers(restore(&store, &id).unwrap().stickers);

    assert_eq!(restored.len(), session.len());
    for (before, after) in session.stickers().iter().zip(restored.stickers()) {
        assert_eq!(after.z_index, before.z_index);
        assert_eq!(after.original_node_index(), before.original_node_index());
        assert_eq!(PersistedGeometry::of(after), PersistedGeometry::of(before));
    }
}
