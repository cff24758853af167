//! バッチ処理
//!
//! ## 処理フロー
//! 1. 画像フォルダをスキャン
//! 2. ファイル名から患者IDを抽出し、眼別の表で行を照合（画素は読まない）
//! 3. 画像ごとに（並列で）読み込み。照合できた画像だけ補正して採点
//! 4. スコアをファイル名順に行へ書き込む
//! 5. 眼別の表と統合レポートを保存
//!
//! 画像単位の失敗は報告してスキップし、バッチは止めない。
//! 画素データは各画像の処理クロージャ内でだけ保持する。

pub mod types;

pub use types::{Ambiguity, BatchSummary, ImageOutcome, ImageReport};

use crate::config::{Config, ScoreParams};
use crate::enhance::{self, EnhancePipeline};
use crate::error::Result;
use crate::export;
use crate::matcher::{Dataset, DatasetColumns, RecordMatch};
use crate::progress;
use crate::scanner::{self, ImageInfo};
use crate::score::{self, ScoreError};
use crate::table::{TableStore, XlsxStore};
use fundus_score_common::{extract_id, EyeSide, MergedRow};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// 採点対象として一意に照合できた行
#[derive(Debug, Clone, Copy)]
struct Target {
    dataset: usize,
    row: usize,
    axial_length: Option<f64>,
}

/// 画像1枚の読み込み・採点結果（画素は含まない）
#[derive(Debug, Clone, PartialEq)]
enum Evaluation {
    DecodeFailed(String),
    /// 読み込めたが採点対象ではない
    Decoded,
    Scored(std::result::Result<f64, ScoreError>),
}

/// 画像群を処理して眼別データセットを更新
///
/// # Arguments
/// * `images` - ファイル名順の画像一覧
/// * `datasets` - 眼別データセット（画像は自分の眼別の表にだけ割り当てられる）
/// * `pipeline` - 補正パイプライン（`None` なら補正済み画像としてそのまま採点）
/// * `params` - スコア算出の定数
///
/// 画像単位の失敗は `BatchSummary` に記録される。`Err` は表の更新自体に失敗した場合のみ。
/// 同じ行を指す画像が複数あるかはファイル名だけで判定する。
pub fn process_images(
    images: &[ImageInfo],
    datasets: &mut [Dataset],
    pipeline: Option<&EnhancePipeline>,
    params: &ScoreParams,
) -> Result<BatchSummary> {
    let mut outcomes: Vec<Option<ImageOutcome>> = vec![None; images.len()];
    // (データセット, 行) → その行を指す画像
    let mut claims: BTreeMap<(usize, usize), Vec<usize>> = BTreeMap::new();

    for (i, info) in images.iter().enumerate() {
        let Some(id) = extract_id(&info.file_name) else {
            outcomes[i] = Some(ImageOutcome::IdentifierNotFound);
            continue;
        };

        outcomes[i] = match datasets.iter().position(|d| d.eye_side() == id.eye_side) {
            None => {
                debug!(file = %info.file_name, side = %id.eye_side, "対応する眼別の表がありません");
                Some(ImageOutcome::SideMismatch(id.eye_side))
            }
            Some(d) => match datasets[d].match_record(&id.patient_id) {
                RecordMatch::Unique(row) => {
                    claims.entry((d, row)).or_default().push(i);
                    None
                }
                RecordMatch::NotFound => Some(ImageOutcome::RecordNotFound {
                    eye_side: id.eye_side,
                    patient_id: id.patient_id,
                }),
                RecordMatch::Ambiguous(n) => Some(ImageOutcome::RecordAmbiguous {
                    eye_side: id.eye_side,
                    patient_id: id.patient_id,
                    reason: Ambiguity::Rows(n),
                }),
            },
        };
    }

    // 1行に1画像だけが対応する場合のみ採点する
    let mut targets: Vec<Option<Target>> = vec![None; images.len()];
    for (&(d, row), claimants) in &claims {
        if let [i] = claimants.as_slice() {
            targets[*i] = Some(Target {
                dataset: d,
                row,
                axial_length: datasets[d].axial_length(row),
            });
            continue;
        }
        for &i in claimants {
            if let Some(id) = extract_id(&images[i].file_name) {
                outcomes[i] = Some(ImageOutcome::RecordAmbiguous {
                    eye_side: id.eye_side,
                    patient_id: id.patient_id,
                    reason: Ambiguity::Images(claimants.len()),
                });
            }
        }
    }

    let bar = progress::new_bar(images.len() as u64, "処理中");
    let evaluations: Vec<Evaluation> = images
        .par_iter()
        .zip(&targets)
        .map(|(info, target)| {
            let evaluation = evaluate(info, target.map(|t| t.axial_length), pipeline, params);
            bar.inc(1);
            evaluation
        })
        .collect();
    bar.finish_and_clear();

    for (i, evaluation) in evaluations.into_iter().enumerate() {
        match evaluation {
            // 読み込み失敗は照合結果より優先して報告する
            Evaluation::DecodeFailed(e) => outcomes[i] = Some(ImageOutcome::DecodeFailed(e)),
            Evaluation::Decoded => {}
            Evaluation::Scored(result) => {
                let Some(target) = targets[i] else { continue };
                outcomes[i] = Some(match result {
                    Ok(value) => {
                        let dataset = &mut datasets[target.dataset];
                        dataset.assign(target.row, &images[i].file_name, value)?;
                        ImageOutcome::Scored {
                            eye_side: dataset.eye_side(),
                            row: target.row,
                            score: value,
                        }
                    }
                    Err(e) => ImageOutcome::Unscoreable(e),
                });
            }
        }
    }

    let reports: Vec<ImageReport> = images
        .iter()
        .zip(outcomes)
        .map(|(info, outcome)| ImageReport {
            file_name: info.file_name.clone(),
            outcome: outcome.unwrap_or(ImageOutcome::IdentifierNotFound),
        })
        .collect();

    for report in &reports {
        match &report.outcome {
            ImageOutcome::Scored { .. } => debug!(file = %report.file_name, "{}", report.outcome),
            ImageOutcome::SideMismatch(_) => {}
            other => warn!(file = %report.file_name, "{}", other),
        }
    }

    Ok(BatchSummary { reports })
}

/// 画像を読み込み、採点対象（`axial_length` が `Some`）なら補正して採点する
///
/// 画像はこの関数の中で破棄される。
fn evaluate(
    info: &ImageInfo,
    axial_length: Option<Option<f64>>,
    pipeline: Option<&EnhancePipeline>,
    params: &ScoreParams,
) -> Evaluation {
    let raw = match enhance::load_rgb(&info.path) {
        Ok(raw) => raw,
        Err(e) => return Evaluation::DecodeFailed(e.to_string()),
    };

    let Some(axial_length) = axial_length else {
        return Evaluation::Decoded;
    };

    let result = match pipeline {
        Some(pipeline) => score::score(&pipeline.enhance(&raw), axial_length, params),
        None => score::score(&raw, axial_length, params),
    };
    Evaluation::Scored(result)
}

/// `score` コマンド全体の結果
#[derive(Debug)]
pub struct ScoringRun {
    pub summary: BatchSummary,
    pub datasets: Vec<Dataset>,
    pub merged: Vec<MergedRow>,
    pub table_outputs: Vec<PathBuf>,
    pub merged_output: PathBuf,
}

/// 表の読み込みから出力保存までを実行
///
/// 画像フォルダ・表が読めない場合、出力を書けない場合は致命的エラー。
pub fn run_scoring(config: &Config, pre_enhanced: bool) -> Result<ScoringRun> {
    let images = scanner::scan_folder(&config.paths.image_dir)?;
    info!(count = images.len(), dir = %config.paths.image_dir.display(), "画像を検出");

    let store = XlsxStore {
        multi_level_header: config.tables.multi_level_header,
    };

    let mut datasets = Vec::with_capacity(EyeSide::ALL.len());
    for side in EyeSide::ALL {
        let source = config.tables.source(side);
        let table = store.load(&source.path)?;
        let columns = DatasetColumns::from_layout(&config.tables, side);
        datasets.push(Dataset::new(side, table, columns)?);
        info!(side = %side, rows = datasets.last().map(Dataset::len).unwrap_or(0), "表を読み込み");
    }

    let pipeline = if pre_enhanced {
        None
    } else {
        Some(EnhancePipeline::new(&config.calibration, &config.enhance)?)
    };

    let summary = process_images(&images, &mut datasets, pipeline.as_ref(), &config.score)?;

    let table_outputs = export::save_datasets(&datasets, &store, &config.paths)?;
    let merged = export::build_merged_report(&datasets);
    let merged_output = config.paths.merged_output_path();
    export::write_merged_csv(&merged, &merged_output)?;

    Ok(ScoringRun {
        summary,
        datasets,
        merged,
        table_outputs,
        merged_output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableLayout;
    use fundus_score_common::{Cell, ColumnKey, Table};
    use image::{Rgb, RgbImage};
    use std::path::Path;
    use tempfile::tempdir;

    fn write_image(dir: &Path, name: &str, size: u32, value: u8) -> ImageInfo {
        let path = dir.join(name);
        RgbImage::from_pixel(size, size, Rgb([value, value, value]))
            .save(&path)
            .unwrap();
        ImageInfo {
            path,
            file_name: name.to_string(),
        }
    }

    fn dataset(side: EyeSide, rows: &[(&str, Cell)]) -> Dataset {
        let mut table = Table::new(vec![
            ColumnKey::new("", "ID"),
            ColumnKey::new("Axial_Length", "Axial_Length"),
        ]);
        for (id, axial) in rows {
            table.push_row(vec![(*id).into(), axial.clone()]);
        }
        Dataset::new(side, table, DatasetColumns::from_layout(&TableLayout::default(), side)).unwrap()
    }

    fn run(images: &[ImageInfo], datasets: &mut [Dataset]) -> BatchSummary {
        process_images(images, datasets, None, &ScoreParams::default()).unwrap()
    }

    #[test]
    fn test_scores_matching_record() {
        let dir = tempdir().unwrap();
        let images = vec![write_image(dir.path(), "im01-RET029OD.png", 250, 128)];
        let mut datasets = vec![dataset(EyeSide::Od, &[("#029", 23.4.into())])];

        let summary = run(&images, &mut datasets);

        let expected = score::score(
            &enhance::load_rgb(&images[0].path).unwrap(),
            Some(23.4),
            &ScoreParams::default(),
        )
        .unwrap();
        assert_eq!(summary.scored(), 1);
        assert_eq!(datasets[0].image_name(0), Some("im01-RET029OD.png"));
        assert_eq!(datasets[0].score_rows()[0].score, expected);
    }

    #[test]
    fn test_unparseable_name_is_skipped() {
        let dir = tempdir().unwrap();
        let images = vec![write_image(dir.path(), "scan_0001.png", 250, 128)];
        let mut datasets = vec![dataset(EyeSide::Od, &[("#029", 23.4.into())])];

        let summary = run(&images, &mut datasets);

        assert_eq!(summary.outcome("scan_0001.png"), Some(&ImageOutcome::IdentifierNotFound));
        assert_eq!(datasets[0].image_name(0), Some(""));
    }

    #[test]
    fn test_decode_failure_is_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("RET029OD.jpg");
        std::fs::write(&path, b"not an image").unwrap();
        let images = vec![ImageInfo {
            path,
            file_name: "RET029OD.jpg".to_string(),
        }];
        let mut datasets = vec![dataset(EyeSide::Od, &[("#029", 23.4.into())])];

        let summary = run(&images, &mut datasets);

        assert!(matches!(
            summary.outcome("RET029OD.jpg"),
            Some(ImageOutcome::DecodeFailed(_))
        ));
        assert_eq!(datasets[0].score_rows()[0].score, 0.0);
    }

    #[test]
    fn test_images_routed_by_eye_side() {
        let dir = tempdir().unwrap();
        let images = vec![
            write_image(dir.path(), "a-RET029OD.png", 250, 128),
            write_image(dir.path(), "b-RET029OS.png", 250, 128),
        ];
        let mut datasets = vec![
            dataset(EyeSide::Od, &[("#029", 23.4.into())]),
            dataset(EyeSide::Os, &[("#029", 23.4.into())]),
        ];

        let summary = run(&images, &mut datasets);

        assert_eq!(summary.scored(), 2);
        assert_eq!(datasets[0].image_name(0), Some("a-RET029OD.png"));
        assert_eq!(datasets[1].image_name(0), Some("b-RET029OS.png"));
    }

    #[test]
    fn test_missing_side_table() {
        let dir = tempdir().unwrap();
        let images = vec![write_image(dir.path(), "RET029OS.png", 250, 128)];
        let mut datasets = vec![dataset(EyeSide::Od, &[("#029", 23.4.into())])];

        let summary = run(&images, &mut datasets);

        assert_eq!(
            summary.outcome("RET029OS.png"),
            Some(&ImageOutcome::SideMismatch(EyeSide::Os))
        );
        assert_eq!(datasets[0].image_name(0), Some(""));
    }

    #[test]
    fn test_record_not_found() {
        let dir = tempdir().unwrap();
        let images = vec![write_image(dir.path(), "RET099OD.png", 250, 128)];
        let mut datasets = vec![dataset(EyeSide::Od, &[("#029", 23.4.into())])];

        let summary = run(&images, &mut datasets);

        assert_eq!(
            summary.outcome("RET099OD.png"),
            Some(&ImageOutcome::RecordNotFound {
                eye_side: EyeSide::Od,
                patient_id: "099".to_string(),
            })
        );
    }

    #[test]
    fn test_duplicate_rows_are_ambiguous() {
        let dir = tempdir().unwrap();
        let images = vec![write_image(dir.path(), "RET031OD.png", 250, 128)];
        let mut datasets = vec![dataset(
            EyeSide::Od,
            &[("#031", 23.4.into()), ("#031", 24.0.into())],
        )];

        let summary = run(&images, &mut datasets);

        assert!(matches!(
            summary.outcome("RET031OD.png"),
            Some(ImageOutcome::RecordAmbiguous {
                reason: Ambiguity::Rows(2),
                ..
            })
        ));
        assert!(datasets[0].score_rows().iter().all(|r| r.image.is_empty()));
    }

    #[test]
    fn test_two_images_for_one_record() {
        let dir = tempdir().unwrap();
        let images = vec![
            write_image(dir.path(), "a-RET029OD.png", 250, 128),
            write_image(dir.path(), "b-RET029OD.png", 250, 128),
            write_image(dir.path(), "c-RET030OD.png", 250, 128),
        ];
        let mut datasets = vec![dataset(
            EyeSide::Od,
            &[("#029", 23.4.into()), ("#030", 23.4.into())],
        )];

        let summary = run(&images, &mut datasets);

        assert_eq!(summary.scored(), 1);
        assert_eq!(summary.skipped(), 2);
        assert!(matches!(
            summary.outcome("b-RET029OD.png"),
            Some(ImageOutcome::RecordAmbiguous {
                reason: Ambiguity::Images(2),
                ..
            })
        ));
        assert_eq!(datasets[0].image_name(0), Some(""));
        assert_eq!(datasets[0].image_name(1), Some("c-RET030OD.png"));
    }

    #[test]
    fn test_crop_larger_than_image_is_unscoreable() {
        let dir = tempdir().unwrap();
        let images = vec![write_image(dir.path(), "RET029OD.png", 100, 128)];
        let mut datasets = vec![dataset(EyeSide::Od, &[("#029", 23.4.into())])];

        let summary = run(&images, &mut datasets);

        assert_eq!(
            summary.outcome("RET029OD.png"),
            Some(&ImageOutcome::Unscoreable(ScoreError::CropOutOfBounds {
                crop: 115,
                width: 100,
                height: 100,
            }))
        );
        assert_eq!(datasets[0].image_name(0), Some(""));
    }

    #[test]
    fn test_missing_axial_length_scores_zero() {
        let dir = tempdir().unwrap();
        let images = vec![write_image(dir.path(), "RET029OD.png", 250, 128)];
        let mut datasets = vec![dataset(EyeSide::Od, &[("#029", Cell::Empty)])];

        let summary = run(&images, &mut datasets);

        assert_eq!(summary.scored(), 1);
        assert_eq!(datasets[0].image_name(0), Some("RET029OD.png"));
        assert_eq!(datasets[0].score_rows()[0].score, 0.0);
    }

    #[test]
    fn test_evaluate_only_scores_targets() {
        let dir = tempdir().unwrap();
        let info = write_image(dir.path(), "RET029OD.png", 250, 128);
        let params = ScoreParams::default();

        assert_eq!(evaluate(&info, None, None, &params), Evaluation::Decoded);
        let expected = score::score(
            &RgbImage::from_pixel(250, 250, Rgb([128, 128, 128])),
            Some(23.4),
            &params,
        );
        assert_eq!(
            evaluate(&info, Some(Some(23.4)), None, &params),
            Evaluation::Scored(expected)
        );
    }

    #[test]
    fn test_decode_failure_reported_for_unmatched_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("RET999OD.jpg");
        std::fs::write(&path, b"not an image").unwrap();
        let images = vec![ImageInfo {
            path,
            file_name: "RET999OD.jpg".to_string(),
        }];
        let mut datasets = vec![dataset(EyeSide::Od, &[("#029", 23.4.into())])];

        let summary = run(&images, &mut datasets);

        assert!(matches!(
            summary.outcome("RET999OD.jpg"),
            Some(ImageOutcome::DecodeFailed(_))
        ));
    }

    #[test]
    fn test_claims_are_resolved_from_file_names() {
        let dir = tempdir().unwrap();
        let broken = dir.path().join("a-RET029OD.jpg");
        std::fs::write(&broken, b"not an image").unwrap();
        let images = vec![
            ImageInfo {
                path: broken,
                file_name: "a-RET029OD.jpg".to_string(),
            },
            write_image(dir.path(), "b-RET029OD.png", 250, 128),
        ];
        let mut datasets = vec![dataset(EyeSide::Od, &[("#029", 23.4.into())])];

        let summary = run(&images, &mut datasets);

        assert!(matches!(
            summary.outcome("a-RET029OD.jpg"),
            Some(ImageOutcome::DecodeFailed(_))
        ));
        assert!(matches!(
            summary.outcome("b-RET029OD.png"),
            Some(ImageOutcome::RecordAmbiguous {
                reason: Ambiguity::Images(2),
                ..
            })
        ));
        assert_eq!(datasets[0].image_name(0), Some(""));
    }
}
