//! Mask textures and asynchronous texture loading.

use futures::future::{BoxFuture, FutureExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::TextureError;

/// Decoded RGBA8 mask texture (sRGB encoded)
#[derive(Clone)]
pub struct MaskTexture {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<Vec<u8>>,
}

impl MaskTexture {
    pub fn new(path: impl Into<PathBuf>, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            width,
            height,
            pixels: Arc::new(pixels),
        }
    }
}

impl std::fmt::Debug for MaskTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaskTexture")
            .field("path", &self.path)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Source of mask textures. Loads run off the paint thread and may complete
/// in any order.
pub trait TextureLoader: Send + Sync {
    fn load(&self, path: PathBuf) -> BoxFuture<'static, Result<MaskTexture, TextureError>>;
}

/// Decodes PNG/JPEG files with the `image` crate on the blocking pool.
#[derive(Debug, Clone, Default)]
pub struct ImageTextureLoader;

impl TextureLoader for ImageTextureLoader {
    fn load(&self, path: PathBuf) -> BoxFuture<'static, Result<MaskTexture, TextureError>> {
        async move {
            tokio::task::spawn_blocking(move || decode_file(&path))
                .await
                .map_err(|e| TextureError::Task(e.to_string()))?
        }
        .boxed()
    }
}

fn decode_file(path: &Path) -> Result<MaskTexture, TextureError> {
    if !path.exists() {
        return Err(TextureError::NotFound(path.display().to_string()));
    }

    let image = image::open(path).map_err(|e| TextureError::Decode {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();

    tracing::debug!("Decoded texture {} ({}x{})", path.display(), width, height);
    Ok(MaskTexture::new(path, width, height, rgba.into_raw()))
}
