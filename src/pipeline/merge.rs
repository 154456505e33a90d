//! Vertical stacking of crops into one problem image.
//!
//! Problems that run over a page break are cut as several crops. They are
//! stacked top to bottom in the order the user confirmed them (not page
//! order), narrower crops centred, with a fixed white gap between them.

use crate::pipeline::crop::CropResult;
use crate::raster::RasterImage;
use image::{Rgba, RgbaImage};
use tracing::debug;

/// Gap between stacked crops, in pixels.
pub const MERGE_GAP: u32 = 16;

/// [`merge_with_gap`] with the standard [`MERGE_GAP`].
pub fn merge(crops: &[RasterImage]) -> Option<RasterImage> {
    merge_with_gap(crops, MERGE_GAP)
}

/// Stack `crops` vertically.
///
/// * no crops → `None`
/// * one crop → that same image (shares the pixel buffer)
/// * otherwise a new white-backed image `max(width) × (Σheight + gap·(n-1))`
pub fn merge_with_gap(crops: &[RasterImage], gap: u32) -> Option<RasterImage> {
    match crops {
        [] => None,
        [only] => Some(only.clone()),
        _ => {
            let width = crops.iter().map(RasterImage::width).max().unwrap_or(0);
            let height = crops.iter().map(RasterImage::height).sum::<u32>()
                + gap * (crops.len() as u32 - 1);

            let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
            let mut y = 0u32;
            for crop in crops {
                // Half the slack, rounding .5 up.
                let x = (width - crop.width() + 1) / 2;
                image::imageops::overlay(&mut canvas, crop.pixels(), x as i64, y as i64);
                y += crop.height() + gap;
            }

            debug!("Merged {} crops → {}x{}", crops.len(), width, height);
            Some(RasterImage::new(canvas))
        }
    }
}

/// Merge the images of `crops` in list order.
pub fn merge_crops(crops: &[CropResult], gap: u32) -> Option<RasterImage> {
    let images: Vec<RasterImage> = crops.iter().map(|c| c.image.clone()).collect();
    merge_with_gap(&images, gap)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, v: u8) -> RasterImage {
        RasterImage::new(RgbaImage::from_pixel(w, h, Rgba([v, v, v, 255])))
    }

    #[test]
    fn empty_is_none() {
        assert!(merge(&[]).is_none());
    }

    #[test]
    fn single_is_identity() {
        let a = solid(30, 40, 0);
        let merged = merge(std::slice::from_ref(&a)).unwrap();
        assert!(merged.ptr_eq(&a));
    }

    #[test]
    fn three_crops_height_with_gaps() {
        let crops = [solid(300, 100, 0), solid(120, 150, 50), solid(250, 80, 100)];
        let merged = merge(&crops).unwrap();
        assert_eq!(merged.height(), 362);
        assert_eq!(merged.width(), 300);
    }

    #[test]
    fn narrower_crops_are_centred_on_white() {
        let merged = merge_with_gap(&[solid(10, 2, 0), solid(5, 2, 0)], 3).unwrap();
        let px = |x, y| merged.pixels().get_pixel(x, y).0[0];
        // second crop: slack 5 → x offset 3
        assert_eq!(px(2, 5), 255);
        assert_eq!(px(3, 5), 0);
        assert_eq!(px(7, 5), 0);
        assert_eq!(px(8, 5), 255);
        // gap rows stay white
        assert_eq!(px(0, 2), 255);
        assert_eq!(px(0, 4), 255);
    }

    #[test]
    fn merge_is_deterministic_and_order_preserving() {
        let crops = vec![
            CropResult {
                source_page_index: 4,
                image: solid(40, 10, 10),
            },
            CropResult {
                source_page_index: 1,
                image: solid(60, 20, 200),
            },
        ];
        let a = merge_crops(&crops, MERGE_GAP).unwrap();
        let b = merge_crops(&crops, MERGE_GAP).unwrap();
        assert_eq!(a.pixels().as_raw(), b.pixels().as_raw());
        // first confirmed crop on top regardless of page index
        assert_eq!(a.pixels().get_pixel(30, 0).0[0], 10);
    }
}
