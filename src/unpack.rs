use std::io::{Cursor, Read};
use std::sync::Arc;

use tracing::{debug, warn};
use zip::ZipArchive;

use crate::assets::{AssetCollection, PlotImage, RunMetadata};
use crate::domain::AssetId;
use crate::error::BundleError;
use crate::handles::HandleStore;
use crate::naming::NameCodec;

/// Parses one complete archive into a fresh collection. The result replaces
/// any prior collection wholesale; the caller releases the old generation's
/// handles before swapping. Container-level damage is fatal and produces no
/// partial collection; entry-level damage is skipped with a warning.
pub fn unpack_bundle(
    bytes: &[u8],
    codec: &NameCodec,
    handles: &mut HandleStore,
) -> Result<AssetCollection, BundleError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|err| BundleError::MalformedArchive(err.to_string()))?;

    let mut collection = AssetCollection::new();
    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(err) => {
                collection.release_handles(handles);
                return Err(BundleError::MalformedArchive(err.to_string()));
            }
        };
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let Some(id) = codec.decode(&name) else {
            debug!(entry = %name, "skipping unrecognized entry");
            continue;
        };
        let mut data = Vec::new();
        if let Err(err) = entry.read_to_end(&mut data) {
            collection.release_handles(handles);
            return Err(BundleError::MalformedArchive(format!("read {name}: {err}")));
        }

        match id {
            AssetId::Metadata => match serde_json::from_slice::<RunMetadata>(&data) {
                // Duplicates are unexpected; the last record wins.
                Ok(metadata) => collection.set_metadata(metadata),
                Err(err) => {
                    warn!(entry = %name, error = %err, "skipping unreadable metadata entry");
                }
            },
            AssetId::FilterComparison => {
                if data.is_empty() {
                    warn!(entry = %name, "dropping zero-length image entry");
                    continue;
                }
                let image = PlotImage::realize(Arc::from(data), handles);
                if let Some(old) = collection.set_filter_comparison(image) {
                    handles.release(&old.handle);
                }
            }
            AssetId::Event { event, kind } => {
                if data.is_empty() {
                    warn!(entry = %name, "dropping zero-length image entry");
                    continue;
                }
                let image = PlotImage::realize(Arc::from(data), handles);
                if let Some(old) = collection.insert_plot(event, kind, image) {
                    handles.release(&old.handle);
                }
            }
        }
    }
    Ok(collection)
}
