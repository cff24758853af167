//! 固定の射影変換による歪み補正

use crate::config::Homography;
use crate::error::{FundusError, Result};
use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};

/// キャリブレーション済みの射影変換（起動時に1度だけ計算）
#[derive(Clone, Copy)]
pub struct PerspectiveCorrection {
    projection: Projection,
}

impl PerspectiveCorrection {
    pub fn from_homography(homography: &Homography) -> Result<Self> {
        let source = homography.source.map(|[x, y]| (x, y));
        let destination = homography.destination.map(|[x, y]| (x, y));

        // from_control_points は source → destination の写像を求める
        let projection = Projection::from_control_points(source, destination).ok_or_else(|| {
            FundusError::Calibration(format!(
                "射影変換を計算できません: {:?} → {:?}",
                homography.source, homography.destination
            ))
        })?;

        Ok(Self { projection })
    }

    /// 入力と同じサイズで出力し、範囲外は黒で埋める
    pub fn apply(&self, image: &RgbImage) -> RgbImage {
        let (width, height) = image.dimensions();
        let mut output = RgbImage::new(width, height);
        warp_into(
            image,
            &self.projection,
            Interpolation::Bilinear,
            Rgb([0, 0, 0]),
            &mut output,
        );
        output
    }
}
