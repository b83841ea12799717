//! Editing session: the ordered set of live stickers.
//!
//! Array position is paint order. Every structural change renumbers
//! `z_index` so that `stickers[i].z_index == i` holds between calls.

use crate::error::SceneError;
use crate::factory::EntityFactory;
use crate::font::FontRegistry;
use crate::id::StickerId;
use crate::layout::{Viewport, fit_to_canvas};
use crate::sticker::{Sticker, StickerState};
use crate::walker::extract_with_fonts;

#[derive(Debug, Clone, Default)]
pub struct Session {
    stickers: Vec<Sticker>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of already-ordered stickers (e.g. a restored draft).
    pub fn from_stickers(stickers: Vec<Sticker>) -> Self {
        let mut session = Self { stickers };
        session.renumber();
        session
    }

    /// Extract an asset, build its stickers, and fit them into `viewport`.
    pub fn import(bytes: &[u8], viewport: Viewport, factory: &EntityFactory) -> Result<Self, SceneError> {
        Self::import_with_fonts(bytes, viewport, factory, FontRegistry::global())
    }

    pub fn import_with_fonts(
        bytes: &[u8],
        viewport: Viewport,
        factory: &EntityFactory,
        fonts: &FontRegistry,
    ) -> Result<Self, SceneError> {
        let nodes = extract_with_fonts(bytes, fonts)?;
        let mut stickers = factory.make_stickers(&nodes);
        fit_to_canvas(&mut stickers, viewport);
        Ok(Self::from_stickers(stickers))
    }

    pub fn stickers(&self) -> &[Sticker] {
        &self.stickers
    }

    pub fn into_stickers(self) -> Vec<Sticker> {
        self.stickers
    }

    pub fn len(&self) -> usize {
        self.stickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stickers.is_empty()
    }

    /// Add on top.
    pub fn push(&mut self, sticker: Sticker) -> StickerId {
        let id = sticker.id;
        self.stickers.push(sticker);
        self.renumber();
        id
    }

    /// Insert at `index` (clamped to the end).
    pub fn insert(&mut self, index: usize, sticker: Sticker) -> StickerId {
        let id = sticker.id;
        let index = index.min(self.stickers.len());
        self.stickers.insert(index, sticker);
        self.renumber();
        id
    }

    pub fn remove(&mut self, id: StickerId) -> Option<Sticker> {
        let pos = self.position(id)?;
        let removed = self.stickers.remove(pos);
        self.renumber();
        Some(removed)
    }

    pub fn get(&self, id: StickerId) -> Option<&Sticker> {
        self.stickers.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: StickerId) -> Option<&mut Sticker> {
        self.stickers.iter_mut().find(|s| s.id == id)
    }

    pub fn at(&self, index: usize) -> Option<&Sticker> {
        self.stickers.get(index)
    }

    pub fn position(&self, id: StickerId) -> Option<usize> {
        self.stickers.iter().position(|s| s.id == id)
    }

    pub fn snapshot(&self, id: StickerId) -> Option<StickerState> {
        self.get(id).map(Sticker::snapshot)
    }

    /// Move a sticker one step backward in z-order (swap with previous).
    /// Returns true if the z-order changed.
    pub fn send_backward(&mut self, id: StickerId) -> bool {
        match self.position(id) {
            Some(pos) if pos > 0 => self.reorder(pos, pos - 1),
            _ => false,
        }
    }

    /// Move a sticker one step forward in z-order (swap with next).
    /// Returns true if the z-order changed.
    pub fn bring_forward(&mut self, id: StickerId) -> bool {
        match self.position(id) {
            Some(pos) if pos + 1 < self.stickers.len() => self.reorder(pos, pos + 1),
            _ => false,
        }
    }

    /// Move a sticker to the bottom.
    pub fn send_to_back(&mut self, id: StickerId) -> bool {
        match self.position(id) {
            Some(pos) if pos > 0 => self.reorder(pos, 0),
            _ => false,
        }
    }

    /// Move a sticker to the top.
    pub fn bring_to_front(&mut self, id: StickerId) -> bool {
        let last = self.stickers.len().saturating_sub(1);
        match self.position(id) {
            Some(pos) if pos < last => self.reorder(pos, last),
            _ => false,
        }
    }

    fn reorder(&mut self, from: usize, to: usize) -> bool {
        let sticker = self.stickers.remove(from);
        self.stickers.insert(to, sticker);
        self.renumber();
        true
    }

    fn renumber(&mut self) {
        for (i, sticker) in self.stickers.iter_mut().enumerate() {
            sticker.z_index = i;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sticker::{RichText, StickerKind};
    use kurbo::{Point, Rect};
    use pretty_assertions::assert_eq;

    fn text(label: &str) -> Sticker {
        Sticker::new(
            StickerKind::RichText(RichText::new(label)),
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Point::new(5.0, 5.0),
        )
    }

    fn order(session: &Session) -> Vec<String> {
        session
            .stickers()
            .iter()
            .map(|s| match &s.kind {
                StickerKind::RichText(t) => t.text.clone(),
                _ => String::new(),
            })
            .collect()
    }

    fn abc() -> (Session, [StickerId; 3]) {
        let mut session = Session::new();
        let a = session.push(text("a"));
        let b = session.push(text("b"));
        let c = session.push(text("c"));
        (session, [a, b, c])
    }

    #[test]
    fn bring_forward_and_send_backward() {
        let (mut session, [a, _, c]) = abc();
        assert!(session.bring_forward(a));
        assert_eq!(order(&session), vec!["b", "a", "c"]);
        assert!(!session.bring_forward(c));
        assert!(session.send_backward(c));
        assert_eq!(order(&session), vec!["b", "c", "a"]);
    }

    #[test]
    fn to_front_and_back() {
        let (mut session, [a, b, c]) = abc();
        assert!(session.bring_to_front(a));
        assert_eq!(order(&session), vec!["b", "c", "a"]);
        assert!(session.send_to_back(c));
        assert_eq!(order(&session), vec!["c", "b", "a"]);
        assert!(!session.send_to_back(c));
        assert!(!session.bring_to_front(a));
        assert_eq!(session.get(b).map(|s| s.z_index), Some(1));
    }

    #[test]
    fn z_index_tracks_position() {
        let (mut session, [_, b, _]) = abc();
        session.insert(0, text("z"));
        session.remove(b);
        let z: Vec<_> = session.stickers().iter().map(|s| s.z_index).collect();
        assert_eq!(z, vec![0, 1, 2]);
        assert_eq!(order(&session), vec!["z", "a", "c"]);
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let (mut session, _) = abc();
        let stranger = text("x").id;
        assert!(!session.bring_forward(stranger));
        assert!(session.remove(stranger).is_none());
        assert_eq!(session.snapshot(stranger), None);
    }
}
