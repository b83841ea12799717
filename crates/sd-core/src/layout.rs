//! Canvas placement of stickers.
//!
//! Two jobs: fitting a freshly imported asset into the canvas viewport, and
//! re-applying persisted geometry in the order hosts expect.

use crate::sticker::Sticker;
use kurbo::{Affine, Point, Rect, Vec2};

/// Inset kept free around fitted content.
pub const FIT_PADDING: f64 = 20.0;

/// The canvas (viewport) dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

/// Scale and center stickers so that their union fits the viewport inset by
/// [`FIT_PADDING`]. Each center is remapped and each transform post-scaled.
///
/// Returns the applied scale, or `None` when there is nothing to fit.
pub fn fit_to_canvas(stickers: &mut [Sticker], viewport: Viewport) -> Option<f64> {
    let union = stickers
        .iter()
        .map(Sticker::visual_frame)
        .reduce(|a, b| a.union(b))?;

    let avail_w = (viewport.width - 2.0 * FIT_PADDING).max(0.0);
    let avail_h = (viewport.height - 2.0 * FIT_PADDING).max(0.0);
    let scale = fit_scale(union, avail_w, avail_h);

    let target = Point::new(
        (viewport.width - union.width() * scale) / 2.0,
        (viewport.height - union.height() * scale) / 2.0,
    );
    for sticker in stickers.iter_mut() {
        let offset: Vec2 = sticker.center - union.origin();
        sticker.center = target + offset * scale;
        sticker.transform = sticker.transform * Affine::scale(scale);
    }

    log::debug!("fit {} stickers into {:?} at scale {scale:.3}", stickers.len(), viewport);
    Some(scale)
}

fn fit_scale(union: Rect, avail_w: f64, avail_h: f64) -> f64 {
    let sx = (union.width() > 0.0).then(|| avail_w / union.width());
    let sy = (union.height() > 0.0).then(|| avail_h / union.height());
    match (sx, sy) {
        (Some(x), Some(y)) => x.min(y),
        (Some(s), None) | (None, Some(s)) => s,
        (None, None) => 1.0,
    }
}

/// A host that may lay a sticker out between geometry phases (e.g. to size
/// text views). Hosts that do no layout use [`NoopLayout`].
pub trait LayoutHost {
    fn layout_pass(&mut self, sticker: &mut Sticker);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLayout;

impl LayoutHost for NoopLayout {
    fn layout_pass(&mut self, _sticker: &mut Sticker) {}
}

/// Geometry as persisted with a sticker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersistedGeometry {
    pub bounds: Rect,
    pub center: Point,
    pub transform: Affine,
}

impl PersistedGeometry {
    pub fn of(sticker: &Sticker) -> Self {
        Self {
            bounds: sticker.bounds,
            center: sticker.center,
            transform: sticker.transform,
        }
    }
}

/// Apply persisted geometry in two phases.
///
/// Bounds must be set under the identity transform, then the host gets one
/// layout pass, then bounds are set again before transform and center. Any
/// other order lets the host's layout clobber the restored size.
pub fn apply_persisted_geometry(sticker: &mut Sticker, geometry: &PersistedGeometry, host: &mut dyn LayoutHost) {
    sticker.transform = Affine::IDENTITY;
    sticker.bounds = geometry.bounds;
    host.layout_pass(sticker);
    sticker.bounds = geometry.bounds;
    sticker.transform = geometry.transform;
    sticker.center = geometry.center;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sticker::{RichText, StickerKind};
    use pretty_assertions::assert_eq;

    fn sticker(x: f64, y: f64, w: f64, h: f64) -> Sticker {
        let frame = Rect::new(x, y, x + w, y + h);
        Sticker::new(
            StickerKind::RichText(RichText::new("t")),
            Rect::from_origin_size(Point::ORIGIN, frame.size()),
            frame.center(),
        )
    }

    #[test]
    fn fit_scales_and_centers() {
        let mut stickers = vec![sticker(0.0, 0.0, 100.0, 100.0), sticker(100.0, 0.0, 100.0, 100.0)];
        let scale = fit_to_canvas(&mut stickers, Viewport { width: 440.0, height: 440.0 }).unwrap();
        // Union 200×100 into 400×400 → scale 2, content 400×200 centered.
        assert_eq!(scale, 2.0);
        assert_eq!(stickers[0].center, Point::new(120.0, 220.0));
        assert_eq!(stickers[1].center, Point::new(320.0, 220.0));
        assert_eq!(stickers[0].transform, Affine::scale(2.0));
    }

    #[test]
    fn fit_of_nothing_is_noop() {
        assert_eq!(fit_to_canvas(&mut [], Viewport::default()), None);
    }

    struct Shrinker;

    impl LayoutHost for Shrinker {
        fn layout_pass(&mut self, sticker: &mut Sticker) {
            assert_eq!(sticker.transform, Affine::IDENTITY);
            sticker.bounds = Rect::new(0.0, 0.0, 1.0, 1.0);
            sticker.center = Point::ORIGIN;
        }
    }

    #[test]
    fn persisted_geometry_survives_host_layout() {
        let mut s = sticker(0.0, 0.0, 10.0, 10.0);
        let geometry = PersistedGeometry {
            bounds: Rect::new(0.0, 0.0, 80.0, 30.0),
            center: Point::new(200.0, 150.0),
            transform: Affine::rotate(0.3),
        };
        apply_persisted_geometry(&mut s, &geometry, &mut Shrinker);
        assert_eq!(PersistedGeometry::of(&s), geometry);
    }
}
