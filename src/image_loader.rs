use crate::error::ImageLoadError;
use std::path::Path;

/// A fetched and decoded page image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl DecodedImage {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }

    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

/// Fetches the bytes behind a page URL and decodes them.
///
/// Called from background jobs, so implementations must be thread-safe and
/// may block.
pub trait ImageLoader: Send + Sync {
    fn load(&self, url: &str) -> Result<DecodedImage, ImageLoadError>;
}

/// Loads pages from the local filesystem, treating the URL as a path.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsImageLoader;

impl ImageLoader for FsImageLoader {
    fn load(&self, url: &str) -> Result<DecodedImage, ImageLoadError> {
        load_image_blocking(Path::new(url))
    }
}

/// Decodes an image file into RGB8 pixel data.
pub fn load_image_blocking(path: &Path) -> Result<DecodedImage, ImageLoadError> {
    let image = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?;
    let width = image.width();
    let height = image.height();
    Ok(DecodedImage::new(image.to_rgb8().into_raw(), width, height))
}
