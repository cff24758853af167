//! 表ストア
//!
//! 読み込み・保存を `TableStore` トレイトの裏に隠し、照合・スコア処理は
//! 共通ライブラリの `Table`（列キー (グループ, フィールド)）だけを扱う。

mod xlsx;

pub use xlsx::XlsxStore;

use crate::error::Result;
use fundus_score_common::Table;
use std::path::Path;

/// 構造化レコードの読み書き
pub trait TableStore {
    fn load(&self, path: &Path) -> Result<Table>;
    fn save(&self, table: &Table, path: &Path) -> Result<()>;
}
