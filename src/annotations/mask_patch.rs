use crate::annotations::bounding_box::BoundingBox;
use crate::annotations::detection::Detection;
use crate::error::{DetectionError, Result};
use image::RgbImage;

/// A fixed-size square soft mask predicted for a single detection.
///
/// Instance segmentation models emit one small continuous-valued patch per
/// detection (28x28 for Mask R-CNN). The patch only becomes a usable
/// segmentation mask once it is resized to the detection's box extent and
/// thresholded into a binary mask, which is what the compositing functions
/// here do. A patch's lifetime ends once it is composited or discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskPatch {
    size: usize,
    data: Vec<f32>,
}

impl MaskPatch {
    /// Wraps a `size * size` buffer of soft mask values.
    pub fn new(size: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != size * size {
            return Err(DetectionError::BufferSize {
                context: "mask patch",
                expected: size * size,
                actual: data.len(),
            });
        }
        Ok(MaskPatch { size, data })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Bilinearly resamples the patch to `width * height`, row-major.
    pub fn resize_bilinear(&self, width: u32, height: u32) -> Vec<f32> {
        let n = self.size;
        let mut out = vec![0.0; (width as usize) * (height as usize)];
        if n == 0 || width == 0 || height == 0 {
            return out;
        }
        let max_coord = (n - 1) as f32;
        for y in 0..height as usize {
            let sy = ((y as f32 + 0.5) * n as f32 / height as f32 - 0.5).clamp(0.0, max_coord);
            let y0 = sy.floor() as usize;
            let y1 = (y0 + 1).min(n - 1);
            let fy = sy - y0 as f32;
            for x in 0..width as usize {
                let sx = ((x as f32 + 0.5) * n as f32 / width as f32 - 0.5).clamp(0.0, max_coord);
                let x0 = sx.floor() as usize;
                let x1 = (x0 + 1).min(n - 1);
                let fx = sx - x0 as f32;
                let top = self.data[y0 * n + x0] * (1.0 - fx) + self.data[y0 * n + x1] * fx;
                let bottom = self.data[y1 * n + x0] * (1.0 - fx) + self.data[y1 * n + x1] * fx;
                out[y * width as usize + x] = top * (1.0 - fy) + bottom * fy;
            }
        }
        out
    }

    /// Resamples to the requested extent and thresholds into a binary mask.
    pub fn binary_mask(&self, width: u32, height: u32, threshold: f32) -> Vec<bool> {
        self.resize_bilinear(width, height)
            .into_iter()
            .map(|v| v >= threshold)
            .collect()
    }

    /// Blends `color` onto the image wherever the thresholded mask is set,
    /// touching only pixels inside the box region.
    pub fn composite_onto(&self, image: &mut RgbImage, bbox: &BoundingBox, color: [u8; 3]) {
        let (img_w, img_h) = image.dimensions();
        if img_w == 0 || img_h == 0 {
            return;
        }
        let clamped = bbox.clamp_to(img_w as f32, img_h as f32);
        let x0 = clamped.xmin().floor() as u32;
        let y0 = clamped.ymin().floor() as u32;
        let x1 = clamped.xmax().floor() as u32;
        let y1 = clamped.ymax().floor() as u32;
        let box_w = x1 - x0 + 1;
        let box_h = y1 - y0 + 1;
        let mask = self.binary_mask(box_w, box_h, 0.5);
        for dy in 0..box_h {
            for dx in 0..box_w {
                if !mask[(dy * box_w + dx) as usize] {
                    continue;
                }
                let pixel = image.get_pixel_mut(x0 + dx, y0 + dy);
                for channel in 0..3 {
                    pixel.0[channel] = pixel.0[channel] / 2 + color[channel] / 2;
                }
            }
        }
    }
}

/// Composites every mask-carrying detection onto the image, coloring each by
/// its class. Detections without a mask patch pass through untouched; they
/// are left for plain box rendering by whatever visualizes the result.
pub fn composite_masks(image: &mut RgbImage, detections: &[Detection], colors: &[[u8; 3]]) {
    for detection in detections {
        let Some(mask) = &detection.mask else {
            continue;
        };
        let color = colors
            .get(detection.class_index)
            .copied()
            .unwrap_or([255, 255, 255]);
        mask.composite_onto(image, &detection.bbox, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_buffer_length() {
        assert!(MaskPatch::new(28, vec![0.0; 100]).is_err());
        assert!(MaskPatch::new(2, vec![0.0; 4]).is_ok());
    }

    #[test]
    fn constant_patch_resizes_to_constant() {
        let patch = MaskPatch::new(4, vec![0.75; 16]).unwrap();
        let resized = patch.resize_bilinear(9, 5);
        assert_eq!(resized.len(), 45);
        for v in resized {
            assert!((v - 0.75).abs() < 1e-6);
        }
    }

    #[test]
    fn binary_mask_thresholds_at_half() {
        let patch = MaskPatch::new(2, vec![0.9, 0.9, 0.1, 0.1]).unwrap();
        let mask = patch.binary_mask(2, 2, 0.5);
        assert_eq!(mask, vec![true, true, false, false]);
    }

    #[test]
    fn composite_touches_only_box_region() {
        let mut image = RgbImage::new(10, 10);
        let patch = MaskPatch::new(2, vec![1.0; 4]).unwrap();
        let bbox = BoundingBox::new(2.0, 2.0, 5.0, 5.0).unwrap();
        patch.composite_onto(&mut image, &bbox, [200, 0, 0]);
        assert_eq!(image.get_pixel(3, 3).0, [100, 0, 0]);
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(image.get_pixel(6, 6).0, [0, 0, 0]);
    }

    #[test]
    fn maskless_detections_are_skipped() {
        let mut image = RgbImage::new(8, 8);
        let detections = vec![Detection {
            bbox: BoundingBox::new(0.0, 0.0, 7.0, 7.0).unwrap(),
            confidence: 0.9,
            class_index: 0,
            mask: None,
        }];
        composite_masks(&mut image, &detections, &[[255, 0, 0]]);
        assert_eq!(image.get_pixel(4, 4).0, [0, 0, 0]);
    }
}
