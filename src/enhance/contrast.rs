//! コントラスト・明るさの正規化
//!
//! sRGB → CIE Lab に変換し、L チャンネルだけに CLAHE（コントラスト制限付き
//! 適応ヒストグラム平坦化）をかけ、a/b はそのまま戻す。
//! L は 8bit 表現（0..=255 に拡大）で扱う。

use image::{GrayImage, Rgb, RgbImage};

// D65 白色点
const XN: f32 = 0.950456;
const ZN: f32 = 1.088754;
const EPSILON: f32 = 0.008856;
const KAPPA: f32 = 903.3;

/// L チャンネルへの CLAHE でコントラストを整える
pub fn enhance_contrast(image: &RgbImage, clip_limit: f32, tile_grid: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let mut lightness = GrayImage::new(width, height);
    let mut chroma = Vec::with_capacity((width * height) as usize);

    for (px, l) in image.pixels().zip(lightness.iter_mut()) {
        let [lum, a, b] = rgb_to_lab(px.0);
        *l = (lum * 255.0 / 100.0).round().clamp(0.0, 255.0) as u8;
        chroma.push((a, b));
    }

    let equalized = clahe(&lightness, clip_limit, tile_grid);

    let mut output = RgbImage::new(width, height);
    for ((px, l), (a, b)) in output.pixels_mut().zip(equalized.iter()).zip(chroma) {
        *px = Rgb(lab_to_rgb([*l as f32 * 100.0 / 255.0, a, b]));
    }

    output
}

/// CLAHE
///
/// 画像を tile_grid × tile_grid のタイルに分け、タイルごとにクリップした
/// ヒストグラムから変換表を作り、隣接4タイルの変換表を双線形補間する。
pub fn clahe(image: &GrayImage, clip_limit: f32, tile_grid: u32) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    let gx = tile_grid.clamp(1, width) as usize;
    let gy = tile_grid.clamp(1, height) as usize;
    let tile_w = width as f32 / gx as f32;
    let tile_h = height as f32 / gy as f32;

    let tile_of = |pos: u32, size: f32, count: usize| ((pos as f32 / size) as usize).min(count - 1);

    let mut histograms = vec![[0u32; 256]; gx * gy];
    for (x, y, px) in image.enumerate_pixels() {
        let tx = tile_of(x, tile_w, gx);
        let ty = tile_of(y, tile_h, gy);
        histograms[ty * gx + tx][px[0] as usize] += 1;
    }

    let luts: Vec<[u8; 256]> = histograms
        .iter()
        .map(|hist| tile_lut(hist, clip_limit))
        .collect();

    // 隣接タイルのインデックスと補間係数
    let neighbors = |pos: u32, size: f32, count: usize| {
        let f = pos as f32 / size - 0.5;
        let lower = f.floor();
        let alpha = f - lower;
        let lower = lower as i64;
        let i1 = lower.clamp(0, count as i64 - 1) as usize;
        let i2 = (lower + 1).clamp(0, count as i64 - 1) as usize;
        (i1, i2, alpha)
    };

    let mut output = GrayImage::new(width, height);
    for (x, y, px) in output.enumerate_pixels_mut() {
        let (tx1, tx2, xa) = neighbors(x, tile_w, gx);
        let (ty1, ty2, ya) = neighbors(y, tile_h, gy);
        let v = image.get_pixel(x, y)[0] as usize;

        let top = luts[ty1 * gx + tx1][v] as f32 * (1.0 - xa) + luts[ty1 * gx + tx2][v] as f32 * xa;
        let bottom = luts[ty2 * gx + tx1][v] as f32 * (1.0 - xa) + luts[ty2 * gx + tx2][v] as f32 * xa;
        let value = top * (1.0 - ya) + bottom * ya;

        px[0] = value.round().clamp(0.0, 255.0) as u8;
    }

    output
}

/// タイルの変換表（クリップ超過分は全ビンに再配分）
fn tile_lut(histogram: &[u32; 256], clip_limit: f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    let area: u32 = histogram.iter().sum();
    if area == 0 {
        for (i, v) in lut.iter_mut().enumerate() {
            *v = i as u8;
        }
        return lut;
    }

    let mut hist = *histogram;

    if clip_limit > 0.0 {
        let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);
        let mut clipped = 0u32;
        for bin in hist.iter_mut() {
            if *bin > limit {
                clipped += *bin - limit;
                *bin = limit;
            }
        }

        let batch = clipped / 256;
        let mut residual = clipped - batch * 256;
        for bin in hist.iter_mut() {
            *bin += batch;
        }
        if residual > 0 {
            let step = (256 / residual).max(1) as usize;
            let mut i = 0;
            while i < 256 && residual > 0 {
                hist[i] += 1;
                residual -= 1;
                i += step;
            }
        }
    }

    let scale = 255.0 / area as f32;
    let mut sum = 0u32;
    for (i, bin) in hist.iter().enumerate() {
        sum += bin;
        lut[i] = (sum as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }

    lut
}

fn srgb_to_linear(v: u8) -> f32 {
    let c = v as f32 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(v: f32) -> u8 {
    let c = if v <= 0.003_130_8 {
        12.92 * v
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    };
    (c * 255.0).round().clamp(0.0, 255.0) as u8
}

fn lab_f(t: f32) -> f32 {
    if t > EPSILON {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

fn lab_f_inv(f: f32) -> f32 {
    if f > 0.206_893 {
        f * f * f
    } else {
        (f - 16.0 / 116.0) / 7.787
    }
}

/// sRGB(8bit) → Lab（L: 0..100, a/b: おおよそ -128..127）
pub fn rgb_to_lab(rgb: [u8; 3]) -> [f32; 3] {
    let [r, g, b] = rgb.map(srgb_to_linear);

    let x = (0.412_453 * r + 0.357_580 * g + 0.180_423 * b) / XN;
    let y = 0.212_671 * r + 0.715_160 * g + 0.072_169 * b;
    let z = (0.019_334 * r + 0.119_193 * g + 0.950_227 * b) / ZN;

    let l = if y > EPSILON { 116.0 * y.cbrt() - 16.0 } else { KAPPA * y };
    let (fx, fy, fz) = (lab_f(x), lab_f(y), lab_f(z));

    [l, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

/// Lab → sRGB(8bit)
pub fn lab_to_rgb(lab: [f32; 3]) -> [u8; 3] {
    let [l, a, b] = lab;

    let y = if l <= KAPPA * EPSILON {
        l / KAPPA
    } else {
        ((l + 16.0) / 116.0).powi(3)
    };
    let fy = lab_f(y);
    let x = lab_f_inv(fy + a / 500.0) * XN;
    let z = lab_f_inv(fy - b / 200.0) * ZN;

    let r = 3.240_479 * x - 1.537_150 * y - 0.498_535 * z;
    let g = -0.969_256 * x + 1.875_991 * y + 0.041_556 * z;
    let bl = 0.055_648 * x - 0.204_043 * y + 1.057_311 * z;

    [r, g, bl].map(linear_to_srgb)
}
