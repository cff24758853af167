//! 統合レポート（CSV）
//!
//! 列は `image,score` の2つ。連番はファイルに書かない。

use crate::error::Result;
use crate::matcher::Dataset;
use fundus_score_common::{merge_score_rows, MergedRow};
use std::fs;
use std::path::Path;

/// 画像が割り当てられた行をデータセット順に連結
pub fn build_merged_report(datasets: &[Dataset]) -> Vec<MergedRow> {
    merge_score_rows(datasets.iter().map(Dataset::score_rows))
}

/// 統合レポートをCSVに書き出す（行が0件でもヘッダーは書く）
pub fn write_merged_csv(rows: &[MergedRow], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    // 0件でもヘッダーを出すため、ヘッダーは手で書いて行は serde で書く
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(["image", "score"])?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}
