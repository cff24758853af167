//! 混濁スコア算出
//!
//! 眼軸長で大きさを正規化した中央の正方形領域を切り出し、グレースケール化して
//! 大津の方法で2値化し、前景（閾値より明るい画素）の割合をスコアとする。

use crate::config::ScoreParams;
use image::{GrayImage, Luma, RgbImage};
use imageproc::contrast::otsu_level;
use thiserror::Error;

/// スコアを算出できない理由
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoreError {
    #[error("眼軸長が正の有限値ではありません: {0}")]
    InvalidAxialLength(f64),

    #[error("切り出しサイズが0になります（眼軸長 {0}）")]
    EmptyCrop(f64),

    #[error("切り出しサイズ {crop}px が画像 {width}x{height} を超えています")]
    CropOutOfBounds { crop: u32, width: u32, height: u32 },
}

/// 中央切り出し領域
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub size: u32,
}

/// 切り出し領域を計算
///
/// `size = floor(crop_base_size * axial_length / reference_axial_length)`、
/// 位置は `(寸法 - size) / 2`（切り捨て）。画像からはみ出す場合はエラー（クランプしない）。
pub fn crop_geometry(
    width: u32,
    height: u32,
    axial_length: f64,
    params: &ScoreParams,
) -> Result<CropRect, ScoreError> {
    if !axial_length.is_finite() || axial_length <= 0.0 {
        return Err(ScoreError::InvalidAxialLength(axial_length));
    }

    let ratio = axial_length / params.reference_axial_length;
    let size = (params.crop_base_size as f64 * ratio).floor();

    if size < 1.0 {
        return Err(ScoreError::EmptyCrop(axial_length));
    }
    if size > width as f64 || size > height as f64 {
        return Err(ScoreError::CropOutOfBounds {
            crop: size.min(u32::MAX as f64) as u32,
            width,
            height,
        });
    }

    let size = size as u32;
    Ok(CropRect {
        x: (width - size) / 2,
        y: (height - size) / 2,
        size,
    })
}

/// 補正済み画像と眼軸長からスコア [0, 1] を算出
///
/// 眼軸長が未定義（`None` / NaN）の場合は 0（算出不能を表す）。
pub fn score(image: &RgbImage, axial_length: Option<f64>, params: &ScoreParams) -> Result<f64, ScoreError> {
    let axial_length = match axial_length {
        Some(v) if !v.is_nan() => v,
        _ => return Ok(0.0),
    };

    let rect = crop_geometry(image.width(), image.height(), axial_length, params)?;
    let cropped = image::imageops::crop_imm(image, rect.x, rect.y, rect.size, rect.size).to_image();

    Ok(foreground_ratio(&to_gray(&cropped)))
}

/// 大津の閾値で2値化したときの前景画素の割合
pub fn foreground_ratio(gray: &GrayImage) -> f64 {
    let total = gray.width() as u64 * gray.height() as u64;
    if total == 0 {
        return 0.0;
    }

    let level = otsu_level(gray);
    let foreground = gray.pixels().filter(|p| p[0] > level).count() as u64;

    foreground as f64 / total as f64
}

/// BT.601 の重みでグレースケール化
pub fn to_gray(image: &RgbImage) -> GrayImage {
    let mut gray = GrayImage::new(image.width(), image.height());
    for (src, dst) in image.pixels().zip(gray.pixels_mut()) {
        let [r, g, b] = src.0;
        let y = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        *dst = Luma([y.round().clamp(0.0, 255.0) as u8]);
    }
    gray
}
