//! 設定
//!
//! キャリブレーション定数・補正パラメータ・スコア算出定数・表の列キー・入出力パスを
//! 1つの JSON にまとめる。全フィールドにデフォルトがあり、部分的な設定ファイルも読める。

use crate::error::{FundusError, Result};
use fundus_score_common::{ColumnKey, EyeSide};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub calibration: Calibration,
    pub enhance: EnhanceParams,
    pub score: ScoreParams,
    pub tables: TableLayout,
    pub paths: PathsConfig,
}

/// 撮影装置固有のキャリブレーション定数
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Calibration {
    pub artifact: ArtifactRegion,
    pub homography: Homography,
}

/// 毎回同じ位置に写り込むアーティファクト（円形領域）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactRegion {
    /// 補正前画像の座標系での中心 (x, y)
    pub center: [i32; 2],
    pub radius: u32,
    /// 補間に使う近傍半径
    pub inpaint_radius: u32,
}

impl Default for ArtifactRegion {
    fn default() -> Self {
        Self {
            center: [188, 211],
            radius: 22,
            inpaint_radius: 3,
        }
    }
}

/// 射影変換の対応点（左上・右上・右下・左下の順）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Homography {
    pub source: [[f32; 2]; 4],
    pub destination: [[f32; 2]; 4],
}

impl Default for Homography {
    fn default() -> Self {
        Self {
            source: [[25.0, 12.0], [230.0, 5.0], [237.0, 230.0], [25.0, 236.0]],
            destination: [[0.0, 0.0], [250.0, 0.0], [250.0, 250.0], [0.0, 250.0]],
        }
    }
}

/// 補正パイプラインのパラメータ
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceParams {
    /// Non-local means のフィルタ強度 h
    pub nlm_strength: f32,
    pub nlm_template_window: u32,
    pub nlm_search_window: u32,
    pub median_kernel: u32,
    pub sharpen_sigma: f32,
    /// 負値で高周波をわずかに抑える
    pub sharpen_intensity: f32,
    pub clahe_clip_limit: f32,
    pub clahe_tile_grid: u32,
}

impl Default for EnhanceParams {
    fn default() -> Self {
        Self {
            nlm_strength: 10.0,
            nlm_template_window: 7,
            nlm_search_window: 21,
            median_kernel: 5,
            sharpen_sigma: 5.0,
            sharpen_intensity: -0.2,
            clahe_clip_limit: 3.0,
            clahe_tile_grid: 8,
        }
    }
}

/// スコア算出の定数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreParams {
    /// 基準眼軸長 (mm)
    pub reference_axial_length: f64,
    /// 基準眼軸長での切り出しサイズ (px)
    pub crop_base_size: u32,
}

impl Default for ScoreParams {
    fn default() -> Self {
        Self {
            reference_axial_length: 26.0,
            crop_base_size: 128,
        }
    }
}

/// 眼別の入力表
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TableSource {
    pub path: PathBuf,
    pub id_column: ColumnKey,
}

/// 表の列構成
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableLayout {
    pub od: TableSource,
    pub os: TableSource,
    pub axial_length_column: ColumnKey,
    pub image_column: ColumnKey,
    pub score_column: ColumnKey,
    pub multi_level_header: bool,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            od: TableSource {
                path: PathBuf::from("od.xlsx"),
                id_column: ColumnKey::new("", "ID"),
            },
            os: TableSource {
                path: PathBuf::from("Datasets for Data Cleaning and Analysis/os.xlsx"),
                id_column: ColumnKey::new("", "ID"),
            },
            axial_length_column: ColumnKey::new("Axial_Length", "Axial_Length"),
            image_column: ColumnKey::group_only("image"),
            score_column: ColumnKey::group_only("score"),
            multi_level_header: true,
        }
    }
}

impl TableLayout {
    pub fn source(&self, side: EyeSide) -> &TableSource {
        match side {
            EyeSide::Od => &self.od,
            EyeSide::Os => &self.os,
        }
    }

    pub fn source_mut(&mut self, side: EyeSide) -> &mut TableSource {
        match side {
            EyeSide::Od => &mut self.od,
            EyeSide::Os => &mut self.os,
        }
    }
}

/// 入出力パス
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub image_dir: PathBuf,
    pub output_dir: PathBuf,
    /// `enhance` コマンドの出力先
    pub enhanced_dir: PathBuf,
    pub od_output: String,
    pub os_output: String,
    pub merged_output: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("image-processing-files/test_images"),
            output_dir: PathBuf::from("."),
            enhanced_dir: PathBuf::from("Results"),
            od_output: "od_score.xlsx".into(),
            os_output: "os_score.xlsx".into(),
            merged_output: "score_results.csv".into(),
        }
    }
}

impl PathsConfig {
    pub fn table_output(&self, side: EyeSide) -> PathBuf {
        let name = match side {
            EyeSide::Od => &self.od_output,
            EyeSide::Os => &self.os_output,
        };
        self.output_dir.join(name)
    }

    pub fn merged_output_path(&self) -> PathBuf {
        self.output_dir.join(&self.merged_output)
    }
}

impl Config {
    /// 設定を読み込み
    ///
    /// 明示パスがあればそれを必須とし、なければ既定の場所、それもなければデフォルト値。
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(FundusError::FileNotFound(path.display().to_string()));
            }
            return Self::load_from(path);
        }

        match Self::config_path() {
            Ok(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// デフォルト設定を書き出す（既存ファイルは上書き）
    ///
    /// 書き出し先は明示パス、なければ既定の場所。書き出したパスを返す。
    pub fn init(explicit: Option<&Path>) -> Result<PathBuf> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };
        Self::default().save(&path)?;
        Ok(path)
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| FundusError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("fundus-score").join("config.json"))
    }
}
