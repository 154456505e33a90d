//! Image encoding: [`RasterImage`] → PNG / JPEG bytes and `data:` URLs.
//!
//! ## Why two formats?
//!
//! Cards, pages and crops are text-heavy and end up in front of students, so
//! they are encoded as lossless PNG. Thumbnails are only a navigation aid and
//! there can be dozens of them, so they use JPEG at quality 60.

use crate::error::CardMakerError;
use crate::raster::RasterImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};
use std::io::Cursor;
use tracing::debug;

/// JPEG quality used for thumbnails.
pub const THUMBNAIL_JPEG_QUALITY: u8 = 60;

/// Encode as PNG.
pub fn encode_png(img: &RasterImage) -> Result<Vec<u8>, CardMakerError> {
    let mut buf = Vec::new();
    img.pixels()
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    debug!("Encoded {:?} → {} bytes PNG", img, buf.len());
    Ok(buf)
}

/// Encode as JPEG. Transparent pixels are flattened onto white first.
pub fn encode_jpeg(img: &RasterImage, quality: u8) -> Result<Vec<u8>, CardMakerError> {
    let rgb = flatten_on_white(img);
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)).encode_image(&rgb)?;
    debug!("Encoded {:?} → {} bytes JPEG q{}", img, buf.len(), quality);
    Ok(buf)
}

/// Wrap encoded bytes in a base64 `data:` URL.
pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// PNG `data:` URL, for embedding a card or crop preview.
pub fn png_data_url(img: &RasterImage) -> Result<String, CardMakerError> {
    Ok(data_url("image/png", &encode_png(img)?))
}

fn flatten_on_white(img: &RasterImage) -> RgbImage {
    let src = img.pixels();
    RgbImage::from_fn(src.width(), src.height(), |x, y| {
        let [r, g, b, a] = src.get_pixel(x, y).0;
        let a = a as u32;
        let over = |c: u8| ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        image::Rgb([over(r), over(g), over(b)])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn red(w: u32, h: u32) -> RasterImage {
        RasterImage::new(RgbaImage::from_pixel(w, h, Rgba([255, 0, 0, 255])))
    }

    #[test]
    fn png_round_trips_pixels() {
        let img = red(10, 6);
        let bytes = encode_png(&img).unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));
        assert_eq!(RasterImage::decode(&bytes).unwrap(), img);
    }

    #[test]
    fn jpeg_has_soi_marker_and_size() {
        let bytes = encode_jpeg(&red(16, 9), THUMBNAIL_JPEG_QUALITY).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let back = RasterImage::decode(&bytes).unwrap();
        assert_eq!((back.width(), back.height()), (16, 9));
    }

    #[test]
    fn transparent_flattens_to_white() {
        let img = RasterImage::new(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0])));
        assert_eq!(flatten_on_white(&img).get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn data_url_is_base64() {
        let url = png_data_url(&red(2, 2)).unwrap();
        let b64 = url.strip_prefix("data:image/png;base64,").unwrap();
        let decoded = STANDARD.decode(b64).expect("valid base64");
        assert!(decoded.starts_with(b"\x89PNG"));
    }
}
