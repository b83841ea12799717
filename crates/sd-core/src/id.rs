use crate::sticker::StickerType;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT: AtomicU64 = AtomicU64::new(0);

/// Handle to a live sticker, unique within the process.
///
/// The session owns the sticker; snapshots and hosts refer to it by id.
/// Ids are not persisted: a restored draft gets fresh ones. Renders as
/// `<type>_<serial>`, e.g. `svgText_3`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StickerId {
    kind: StickerType,
    serial: u64,
}

impl StickerId {
    pub fn next(kind: StickerType) -> Self {
        Self {
            kind,
            serial: NEXT.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn kind(self) -> StickerType {
        self.kind
    }

    pub fn serial(self) -> u64 {
        self.serial
    }
}

impl fmt::Debug for StickerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{self}")
    }
}

impl fmt::Display for StickerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind, self.serial)
    }
}

impl Serialize for StickerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
