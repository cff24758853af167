use image::RgbImage;
use imageproc::filter::gaussian_blur_f32;

/// アンシャープマスク
///
/// `out = image * (1 + intensity) + max(image - blur, 0) * intensity`
///
/// intensity が負のときは輪郭を強調せず、高周波成分をわずかに抑える。
pub fn unsharp_mask(image: &RgbImage, sigma: f32, intensity: f32) -> RgbImage {
    let blurred = if sigma > 0.0 {
        gaussian_blur_f32(image, sigma)
    } else {
        image.clone()
    };

    let mut output = RgbImage::new(image.width(), image.height());
    for ((out, &orig), &blur) in output.iter_mut().zip(image.iter()).zip(blurred.iter()) {
        // 差分は飽和減算（負にならない）
        let diff = orig.saturating_sub(blur) as f32;
        let value = orig as f32 * (1.0 + intensity) + diff * intensity;
        *out = value.round().clamp(0.0, 255.0) as u8;
    }

    output
}
