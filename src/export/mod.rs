pub mod merged;

pub use merged::{build_merged_report, write_merged_csv};

use crate::config::PathsConfig;
use crate::error::Result;
use crate::matcher::Dataset;
use crate::table::TableStore;
use std::path::PathBuf;
use tracing::info;

/// 眼別の表を設定の出力先に保存
///
/// 保存したパスをデータセットの順に返す。
pub fn save_datasets<S: TableStore>(
    datasets: &[Dataset],
    store: &S,
    paths: &PathsConfig,
) -> Result<Vec<PathBuf>> {
    let mut outputs = Vec::with_capacity(datasets.len());

    for dataset in datasets {
        let path = paths.table_output(dataset.eye_side());
        store.save(dataset.table(), &path)?;
        info!(side = %dataset.eye_side(), path = %path.display(), "表を保存");
        outputs.push(path);
    }

    Ok(outputs)
}
