use image::RgbImage;

/// Pads an rgb8 image by adding black pixels to the right and bottom.
pub fn pad_right_bottom(original: &RgbImage, new_width: u32, new_height: u32) -> RgbImage {
    let mut padded = RgbImage::new(
        new_width.max(original.width()),
        new_height.max(original.height()),
    );
    for (x, y, pixel) in original.enumerate_pixels() {
        padded.put_pixel(x, y, *pixel);
    }
    padded
}

/// Geometry of a proportionally-resized image padded onto a canvas whose
/// sides are multiples of 32.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaddedCanvas {
    pub resized_width: u32,
    pub resized_height: u32,
    pub padded_width: u32,
    pub padded_height: u32,
    /// Scale factor from original pixels to canvas pixels.
    pub ratio: f32,
}

/// Computes the canvas for models that resize the shorter image side to
/// `target_min_side` and pad each dimension up to the next multiple of 32.
pub fn padded_canvas(orig_width: u32, orig_height: u32, target_min_side: u32) -> PaddedCanvas {
    let ratio = target_min_side as f32 / orig_width.min(orig_height) as f32;
    let resized_width = (ratio * orig_width as f32) as u32;
    let resized_height = (ratio * orig_height as f32) as u32;
    PaddedCanvas {
        resized_width,
        resized_height,
        padded_width: resized_width.div_ceil(32) * 32,
        padded_height: resized_height.div_ceil(32) * 32,
        ratio,
    }
}
