use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use futures::channel::oneshot;
use log::{debug, error, info};

use crate::error::{CanvasError, CanvasResult};
use crate::layer::ImageHandle;

/// Turns encoded bytes into an attachable image
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> CanvasResult<ImageHandle>;
}

/// Decoder backed by the `image` crate; accepts whatever formats it was
/// built with
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateDecoder;

impl ImageDecoder for ImageCrateDecoder {
    fn decode(&self, bytes: &[u8]) -> CanvasResult<ImageHandle> {
        let decoded = image::load_from_memory(bytes).map_err(|err| {
            error!("Failed to decode image ({} bytes): {}", bytes.len(), err);
            CanvasError::ImageDecode(err.to_string())
        })?;
        debug!("Decoded image: {}x{}", decoded.width(), decoded.height());
        ImageHandle::from_rgba(&decoded.to_rgba8())
    }
}

/// Check whether a path looks like an image we can load, by extension
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp"))
}

/// Reads and decodes an image file
pub fn decode_file(decoder: &dyn ImageDecoder, path: &Path) -> CanvasResult<ImageHandle> {
    info!("Loading image from path: {}", path.display());
    let bytes = std::fs::read(path).inspect_err(|err| {
        error!("Failed to read image file: {}: {}", path.display(), err);
    })?;
    decoder.decode(&bytes)
}

/// Decodes on a worker thread; the returned future resolves once it is done.
///
/// The caller is expected to hold a [`crate::manager::PendingImage`] and hand
/// the result to `LayerManager::finish_image_load`, which drops it if the
/// target layer changed in the meantime.
pub fn decode_in_background(
    decoder: Arc<dyn ImageDecoder>,
    bytes: Vec<u8>,
) -> impl Future<Output = CanvasResult<ImageHandle>> {
    let (sender, receiver) = oneshot::channel();
    std::thread::spawn(move || {
        // The receiver may have been dropped; nobody is waiting then.
        let _ = sender.send(decoder.decode(&bytes));
    });
    async move {
        receiver
            .await
            .map_err(|_| CanvasError::ImageDecode("decoder thread exited without a result".to_string()))?
    }
}
