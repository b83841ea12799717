pub mod codec;
pub mod error;
pub mod record;
pub mod store;

pub use codec::{Encoded, RasterFile, SkippedRecord, decode_manifest, encode, reconstruct};
pub use error::{DraftError, SkipReason};
pub use record::{DraftDocument, ImageRecord, RecordPayload, ShapeRecord, StickerRecord, image_file_name};
pub use store::{AssetProvider, DirAssetProvider, DraftStore, NoAssets, Restored, StoreConfig};
