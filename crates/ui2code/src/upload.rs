//! Upload normalization: accept a JPEG or PNG screenshot and re-encode it
//! as a three-channel JPEG for the model.

use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageFormat};

use crate::types::{Ui2CodeError, Ui2CodeResult};

/// MIME type every prepared image is sent with.
pub const PREPARED_MIME: &str = "image/jpeg";

/// JPEG quality used when re-encoding uploads.
const JPEG_QUALITY: u8 = 95;

/// A screenshot ready to be sent to the model.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
    had_alpha: bool,
}

impl PreparedImage {
    /// Decode an uploaded file, drop any alpha channel and re-encode as JPEG.
    pub fn from_upload(data: &[u8], file_name: Option<&str>) -> Ui2CodeResult<Self> {
        if let Some(name) = file_name {
            if !is_supported_upload(name) {
                return Err(Ui2CodeError::UnsupportedUpload(format!(
                    "{name}: expected a .jpg, .jpeg or .png file"
                )));
            }
        }

        let format = image::guess_format(data).map_err(|_| {
            Ui2CodeError::UnsupportedUpload("unrecognized image data".to_string())
        })?;
        if !matches!(format, ImageFormat::Jpeg | ImageFormat::Png) {
            return Err(Ui2CodeError::UnsupportedUpload(format!(
                "{format:?} images are not accepted, use JPEG or PNG"
            )));
        }

        let img = image::load_from_memory_with_format(data, format)?;
        Self::from_image(&img)
    }

    /// Normalize an already-decoded image.
    pub fn from_image(img: &DynamicImage) -> Ui2CodeResult<Self> {
        let (width, height) = img.dimensions();
        let had_alpha = img.color().has_alpha();
        if had_alpha {
            tracing::debug!("Stripping alpha channel from {width}x{height} upload");
        }

        let rgb = img.to_rgb8();
        let mut bytes = Vec::new();
        let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut bytes), JPEG_QUALITY);
        rgb.write_with_encoder(encoder)?;

        Ok(Self {
            bytes,
            width,
            height,
            had_alpha,
        })
    }

    /// Encoded JPEG bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &'static str {
        PREPARED_MIME
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Whether the upload carried an alpha channel.
    pub fn had_alpha(&self) -> bool {
        self.had_alpha
    }
}

/// Check the file extension of an upload: jpg, jpeg or png.
pub fn is_supported_upload(file_name: &str) -> bool {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    matches!(ext.as_str(), "png" | "jpg" | "jpeg")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::png::PngEncoder;
    use image::{ColorType, Rgba, RgbaImage};

    fn rgba_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 200, 30, 128]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_with_encoder(PngEncoder::new(&mut buf))
            .unwrap();
        buf
    }

    #[test]
    fn test_rgba_png_becomes_three_channel_jpeg() {
        let prepared = PreparedImage::from_upload(&rgba_png(40, 20), Some("shot.png")).unwrap();
        assert!(prepared.had_alpha());
        assert_eq!(prepared.dimensions(), (40, 20));
        assert_eq!(prepared.mime_type(), "image/jpeg");

        assert_eq!(
            image::guess_format(prepared.bytes()).unwrap(),
            ImageFormat::Jpeg
        );
        let decoded = image::load_from_memory(prepared.bytes()).unwrap();
        assert_eq!(decoded.color(), ColorType::Rgb8);
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn test_jpeg_upload_without_name() {
        let img = DynamicImage::new_rgb8(100, 100);
        let mut buf = Vec::new();
        img.write_with_encoder(JpegEncoder::new(&mut buf)).unwrap();

        let prepared = PreparedImage::from_upload(&buf, None).unwrap();
        assert!(!prepared.had_alpha());
        assert_eq!(prepared.dimensions(), (100, 100));
    }

    #[test]
    fn test_rejects_other_formats() {
        let img = DynamicImage::new_rgb8(4, 4);
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Bmp)
            .unwrap();

        let err = PreparedImage::from_upload(&buf, None).unwrap_err();
        assert!(matches!(err, Ui2CodeError::UnsupportedUpload(_)));
    }

    #[test]
    fn test_rejects_garbage() {
        let err = PreparedImage::from_upload(b"not an image", None).unwrap_err();
        assert!(matches!(err, Ui2CodeError::UnsupportedUpload(_)));
    }

    #[test]
    fn test_rejects_wrong_extension() {
        let err = PreparedImage::from_upload(&rgba_png(2, 2), Some("shot.gif")).unwrap_err();
        assert!(matches!(err, Ui2CodeError::UnsupportedUpload(_)));
    }

    #[test]
    fn test_supported_uploads() {
        assert!(is_supported_upload("ui.png"));
        assert!(is_supported_upload("ui.JPG"));
        assert!(is_supported_upload("ui.jpeg"));
        assert!(!is_supported_upload("ui.webp"));
        assert!(!is_supported_upload("ui"));
    }
}
