//! 眼底写真の補正パイプライン
//!
//! 固定順序の5段で補正する。順序を入れ替えるとキャリブレーション定数が無効になる。
//! 1. アーティファクト補間（補正前画像の座標系で定義）
//! 2. 射影変換による歪み補正
//! 3. ノイズ除去（Non-local means → メディアン）
//! 4. アンシャープマスク
//! 5. L チャンネルの CLAHE

pub mod inpaint;
pub mod perspective;
pub mod denoise;
pub mod sharpen;
pub mod contrast;

use crate::config::{Calibration, EnhanceParams};
use crate::error::{FundusError, Result};
use crate::progress;
use crate::scanner;
use image::RgbImage;
use perspective::PerspectiveCorrection;
use rayon::prelude::*;
use std::path::Path;
use tracing::{debug, warn};

/// 補正パイプライン（画像ごとに独立、複数スレッドから共有可）
pub struct EnhancePipeline {
    calibration: Calibration,
    params: EnhanceParams,
    perspective: PerspectiveCorrection,
}

impl EnhancePipeline {
    pub fn new(calibration: &Calibration, params: &EnhanceParams) -> Result<Self> {
        let perspective = PerspectiveCorrection::from_homography(&calibration.homography)?;
        Ok(Self {
            calibration: calibration.clone(),
            params: params.clone(),
            perspective,
        })
    }

    /// 生画像 → 補正済み画像（寸法は変わらない）
    pub fn enhance(&self, raw: &RgbImage) -> RgbImage {
        let (width, height) = raw.dimensions();
        let artifact = &self.calibration.artifact;
        let p = &self.params;

        let mask = inpaint::circle_mask(width, height, artifact.center, artifact.radius);
        let inpainted = inpaint::inpaint(raw, &mask, artifact.inpaint_radius);
        let unwarped = self.perspective.apply(&inpainted);
        let denoised = denoise::denoise(
            &unwarped,
            p.nlm_strength,
            p.nlm_template_window,
            p.nlm_search_window,
            p.median_kernel,
        );
        let sharpened = sharpen::unsharp_mask(&denoised, p.sharpen_sigma, p.sharpen_intensity);

        contrast::enhance_contrast(&sharpened, p.clahe_clip_limit, p.clahe_tile_grid)
    }
}

/// 画像ファイルを RGB で読み込み
pub fn load_rgb(path: &Path) -> Result<RgbImage> {
    image::open(path)
        .map(|img| img.to_rgb8())
        .map_err(|e| FundusError::ImageLoad(format!("{}: {}", path.display(), e)))
}

/// `enhance` コマンドの集計
#[derive(Debug, Clone, Default)]
pub struct EnhanceSummary {
    pub total: usize,
    pub enhanced: usize,
    /// 読み込めずスキップしたファイル名
    pub failed: Vec<String>,
}

enum FileOutcome {
    Enhanced,
    LoadFailed(String),
}

/// フォルダ内の全画像を補正し、同じファイル名で出力フォルダに保存
///
/// 読み込めない画像は報告してスキップする。保存の失敗は致命的エラー。
pub fn enhance_folder(input: &Path, output: &Path, pipeline: &EnhancePipeline) -> Result<EnhanceSummary> {
    let images = scanner::scan_folder(input)?;
    std::fs::create_dir_all(output)?;

    let bar = progress::new_bar(images.len() as u64, "補正中");

    let outcomes: Vec<Result<FileOutcome>> = images
        .par_iter()
        .map(|info| {
            let outcome = match load_rgb(&info.path) {
                Ok(raw) => {
                    let enhanced = pipeline.enhance(&raw);
                    let out_path = output.join(&info.file_name);
                    enhanced
                        .save(&out_path)
                        .map_err(|e| FundusError::ImageSave(format!("{}: {}", out_path.display(), e)))?;
                    debug!(file = %info.file_name, "補正済み画像を保存");
                    FileOutcome::Enhanced
                }
                Err(e) => {
                    warn!(file = %info.file_name, error = %e, "画像を読み込めません。スキップします");
                    FileOutcome::LoadFailed(info.file_name.clone())
                }
            };
            bar.inc(1);
            Ok(outcome)
        })
        .collect();

    bar.finish_and_clear();

    let mut summary = EnhanceSummary {
        total: images.len(),
        ..Default::default()
    };
    for outcome in outcomes {
        match outcome? {
            FileOutcome::Enhanced => summary.enhanced += 1,
            FileOutcome::LoadFailed(name) => summary.failed.push(name),
        }
    }

    Ok(summary)
}
