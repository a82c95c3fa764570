use crate::error::{DetectionError, Result};
use image::RgbImage;

/// Converts an interleaved 8-bit image buffer into a planar float blob.
///
/// The source is row-major HWC (all channels of a pixel adjacent); the
/// destination is CHW (all of channel 0, then all of channel 1, ...), which
/// is the layout ONNX vision models expect. Each element becomes
/// `(src - mean[c]) / std[c]`; missing mean/std entries default to 0 and 1,
/// so passing empty slices is a plain u8-to-f32 copy.
///
/// Both buffers must be sized exactly `width * height * channels`. A
/// mismatch is a caller contract violation and fails with the expected and
/// actual lengths rather than reading or writing out of bounds.
pub fn blob_from_image(
    src: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    mean: &[f32],
    std: &[f32],
    dst: &mut [f32],
) -> Result<()> {
    let expected = width * height * channels;
    if src.len() != expected {
        return Err(DetectionError::BufferSize {
            context: "source image buffer",
            expected,
            actual: src.len(),
        });
    }
    if dst.len() != expected {
        return Err(DetectionError::BufferSize {
            context: "destination blob",
            expected,
            actual: dst.len(),
        });
    }
    let plane = width * height;
    for c in 0..channels {
        let channel_mean = mean.get(c).copied().unwrap_or(0.0);
        let channel_std = std.get(c).copied().unwrap_or(1.0);
        for y in 0..height {
            for x in 0..width {
                let value = src[(y * width + x) * channels + c] as f32;
                dst[c * plane + y * width + x] = (value - channel_mean) / channel_std;
            }
        }
    }
    Ok(())
}

/// `blob_from_image` for an `RgbImage`, allocating the destination.
pub fn rgb_image_blob(image: &RgbImage, mean: &[f32], std: &[f32]) -> Result<Vec<f32>> {
    let (width, height) = image.dimensions();
    let mut dst = vec![0.0; 3 * (width as usize) * (height as usize)];
    blob_from_image(
        image.as_raw(),
        width as usize,
        height as usize,
        3,
        mean,
        std,
        &mut dst,
    )?;
    Ok(dst)
}
