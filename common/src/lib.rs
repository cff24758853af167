//! Fundus Score Common Library
//!
//! CLIと他のフロントエンドで共有される型とユーティリティ（画像処理を含まない）

pub mod types;
pub mod error;
pub mod identifier;
pub mod table;
pub mod report;
#[cfg(feature = "excel")]
pub mod export;

pub use types::{EyeSide, ImageId, ColumnKey};
pub use error::{Error, Result};
pub use identifier::{extract_id, normalize_id};
pub use table::{Cell, Table};
pub use report::{MergedRow, ScoreRow, merge_score_rows};
