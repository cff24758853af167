//! エラー型定義

use thiserror::Error;

/// 共通エラー型（表操作）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Row out of range: {0}")]
    RowOutOfRange(usize),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
