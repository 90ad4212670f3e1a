//! Typed adapters over the byte-level cache operations
//!
//! Values are encoded before anything is written, so an encode failure leaves
//! both tiers untouched. Decode failures are returned to the caller.

use crate::cache::TieredCache;
use crate::error::Result;
use crate::types::ImageFormat;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::DynamicImage;
use serde::de::DeserializeOwned;
use serde::Serialize;

impl TieredCache {
    /// Store any serializable value as JSON
    pub fn write_value<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let data = serde_json::to_vec(value)?;
        self.write(key, data);
        Ok(())
    }

    /// Read a JSON value written by [`TieredCache::write_value`]
    pub async fn read_value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read(key).await {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    pub fn write_string(&self, key: &str, value: &str) -> Result<()> {
        self.write_value(key, value)
    }

    pub async fn read_string(&self, key: &str) -> Result<Option<String>> {
        self.read_value(key).await
    }

    pub fn write_image(&self, key: &str, image: &DynamicImage, format: ImageFormat) -> Result<()> {
        let data = encode_image(image, format)?;
        self.write(key, data);
        Ok(())
    }

    pub async fn read_image(&self, key: &str) -> Result<Option<DynamicImage>> {
        match self.read(key).await {
            Some(data) => Ok(Some(decode_image(&data)?)),
            None => Ok(None),
        }
    }
}

/// Encode `image` as PNG or JPEG
pub fn encode_image(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut data = Vec::new();

    match format {
        ImageFormat::Png => image.write_with_encoder(PngEncoder::new(&mut data))?,
        ImageFormat::Jpeg { quality } => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut data, quality.clamp(1, 100));
            rgb.write_with_encoder(encoder)?;
        }
    }

    Ok(data)
}

/// Decode an image, guessing the format from its contents
pub fn decode_image(data: &[u8]) -> Result<DynamicImage> {
    Ok(image::load_from_memory(data)?)
}
