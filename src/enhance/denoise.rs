//! ノイズ除去
//!
//! 1. Non-local means（連続的なノイズ向け）
//! 2. メディアンフィルタ（ごま塩ノイズ向け）

use image::RgbImage;
use imageproc::filter::median_filter;

/// Non-local means → メディアンの2段でノイズを除去
pub fn denoise(
    image: &RgbImage,
    strength: f32,
    template_window: u32,
    search_window: u32,
    median_kernel: u32,
) -> RgbImage {
    let smoothed = non_local_means(image, strength, template_window, search_window);
    median(&smoothed, median_kernel)
}

/// カラー画像の Non-local means
///
/// 探索窓内の各オフセットについてパッチ間の平均二乗差 d を求め、
/// 重み exp(-d / h²) で画素値を平均する。パッチ和は積分画像で求める。
/// 画像外は端の画素を複製して参照する。
pub fn non_local_means(image: &RgbImage, strength: f32, template_window: u32, search_window: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    if strength <= 0.0 || width == 0 || height == 0 {
        return image.clone();
    }

    let (w, h) = (width as usize, height as usize);
    let t = (template_window / 2) as usize;
    let s = (search_window / 2) as i64;
    let h2 = (strength * strength) as f64;
    let src = image.as_raw();

    let mut weight_sum = vec![0f64; w * h];
    let mut acc = vec![0f64; w * h * 3];
    let mut diff = vec![0f64; w * h];
    let mut integral = vec![0f64; (w + 1) * (h + 1)];

    let clamp_x = |x: i64| x.clamp(0, w as i64 - 1) as usize;
    let clamp_y = |y: i64| y.clamp(0, h as i64 - 1) as usize;

    for dy in -s..=s {
        for dx in -s..=s {
            // 画素ごとの差分（3チャンネル平均）
            for y in 0..h {
                let sy = clamp_y(y as i64 + dy);
                for x in 0..w {
                    let sx = clamp_x(x as i64 + dx);
                    let p = (y * w + x) * 3;
                    let q = (sy * w + sx) * 3;
                    let d: f64 = (0..3)
                        .map(|c| {
                            let v = src[p + c] as f64 - src[q + c] as f64;
                            v * v
                        })
                        .sum();
                    diff[y * w + x] = d / 3.0;
                }
            }

            build_integral(&diff, w, h, &mut integral);

            for y in 0..h {
                let sy = clamp_y(y as i64 + dy);
                let y0 = y.saturating_sub(t);
                let y1 = (y + t).min(h - 1);
                for x in 0..w {
                    let sx = clamp_x(x as i64 + dx);
                    let x0 = x.saturating_sub(t);
                    let x1 = (x + t).min(w - 1);

                    let count = ((x1 - x0 + 1) * (y1 - y0 + 1)) as f64;
                    let patch = box_sum(&integral, w, x0, y0, x1, y1) / count;
                    let weight = (-patch / h2).exp();

                    let i = y * w + x;
                    let q = (sy * w + sx) * 3;
                    weight_sum[i] += weight;
                    for c in 0..3 {
                        acc[i * 3 + c] += weight * src[q + c] as f64;
                    }
                }
            }
        }
    }

    let data: Vec<u8> = acc
        .iter()
        .enumerate()
        .map(|(k, v)| (v / weight_sum[k / 3]).round().clamp(0.0, 255.0) as u8)
        .collect();

    // 寸法とバッファ長は一致している
    RgbImage::from_raw(width, height, data).unwrap_or_else(|| image.clone())
}

/// メディアンフィルタ（kernel は奇数の窓幅、1以下なら何もしない）
pub fn median(image: &RgbImage, kernel: u32) -> RgbImage {
    let radius = kernel / 2;
    if radius == 0 {
        return image.clone();
    }
    median_filter(image, radius, radius)
}

fn build_integral(values: &[f64], w: usize, h: usize, integral: &mut [f64]) {
    let stride = w + 1;
    for x in 0..=w {
        integral[x] = 0.0;
    }
    for y in 0..h {
        let mut row_sum = 0.0;
        integral[(y + 1) * stride] = 0.0;
        for x in 0..w {
            row_sum += values[y * w + x];
            integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row_sum;
        }
    }
}

fn box_sum(integral: &[f64], w: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> f64 {
    let stride = w + 1;
    integral[(y1 + 1) * stride + x1 + 1] - integral[y0 * stride + x1 + 1] - integral[(y1 + 1) * stride + x0]
        + integral[y0 * stride + x0]
}
