use thiserror::Error;

#[derive(Error, Debug)]
pub enum FundusError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    #[error("画像保存エラー: {0}")]
    ImageSave(String),

    #[error("表の読み込みエラー: {0}")]
    TableLoad(String),

    #[error("キャリブレーションが不正: {0}")]
    Calibration(String),

    #[error("Excel生成エラー: {0}")]
    ExcelGeneration(String),

    #[error("CSV出力エラー: {0}")]
    CsvExport(#[from] csv::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] fundus_score_common::Error),
}

pub type Result<T> = std::result::Result<T, FundusError>;
