//! Image to NCHW tensor conversion for the detector and the classifier.

use image::{DynamicImage, imageops::FilterType};
use ndarray::Array4;

/// ImageNet channel statistics the classifier was trained with.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Square resize to `size`, scaled to `[0, 1]`.
pub fn detection_tensor(image: &DynamicImage, size: u32) -> Array4<f32> {
    let resized = image.resize_exact(size, size, FilterType::Triangle).to_rgb8();
    let mut tensor = Array4::<f32>::zeros((1, 3, size as usize, size as usize));

    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    tensor
}

/// Resize the shorter side to `resize`, centre crop `crop` x `crop`, then
/// normalise with ImageNet mean/std.
pub fn classification_tensor(image: &DynamicImage, resize: u32, crop: u32) -> Array4<f32> {
    let resized = resize_shorter_side(image, resize);
    let cropped = center_crop(&resized, crop).to_rgb8();
    let (width, height) = cropped.dimensions();

    let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));
    for (x, y, pixel) in cropped.enumerate_pixels() {
        for c in 0..3 {
            let value = pixel[c] as f32 / 255.0;
            tensor[[0, c, y as usize, x as usize]] = (value - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }

    tensor
}

pub fn resize_shorter_side(image: &DynamicImage, target: u32) -> DynamicImage {
    let (width, height) = (image.width().max(1), image.height().max(1));
    let (new_width, new_height) = if width <= height {
        let scaled = (height as f64 * target as f64 / width as f64).round() as u32;
        (target, scaled.max(1))
    } else {
        let scaled = (width as f64 * target as f64 / height as f64).round() as u32;
        (scaled.max(1), target)
    };
    image.resize_exact(new_width, new_height, FilterType::Triangle)
}

/// Centre crop; pads nothing, so images smaller than `size` come back as-is
/// along that axis.
pub fn center_crop(image: &DynamicImage, size: u32) -> DynamicImage {
    let crop_width = size.min(image.width());
    let crop_height = size.min(image.height());
    let x = (image.width() - crop_width) / 2;
    let y = (image.height() - crop_height) / 2;
    image.crop_imm(x, y, crop_width, crop_height)
}
