//! 患者・眼別・列キーの型定義
//!
//! - EyeSide: 右眼(OD) / 左眼(OS)
//! - ImageId: ファイル名から抽出した (患者ID, 眼別)
//! - ColumnKey: 2段ヘッダー表の (グループ, フィールド) 列キー

use serde::{Deserialize, Serialize};
use std::fmt;

/// 眼別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EyeSide {
    /// 右眼 (oculus dexter)
    #[serde(rename = "OD")]
    Od,
    /// 左眼 (oculus sinister)
    #[serde(rename = "OS")]
    Os,
}

impl EyeSide {
    pub const ALL: [EyeSide; 2] = [EyeSide::Od, EyeSide::Os];

    /// ファイル名・表で使われるコード
    pub fn code(&self) -> &'static str {
        match self {
            EyeSide::Od => "OD",
            EyeSide::Os => "OS",
        }
    }
}

impl fmt::Display for EyeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for EyeSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "OD" => Ok(EyeSide::Od),
            "OS" => Ok(EyeSide::Os),
            _ => Err(format!("Unknown eye side: {}. Use OD or OS", s)),
        }
    }
}

/// ファイル名から抽出した識別子
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageId {
    /// 3桁以上にゼロ埋めされた患者ID
    pub patient_id: String,
    pub eye_side: EyeSide,
}

/// 2段ヘッダーの列キー (グループ, フィールド)
///
/// 1段ヘッダーの表ではグループは空文字列。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnKey {
    pub group: String,
    pub field: String,
}

impl ColumnKey {
    pub fn new(group: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            field: field.into(),
        }
    }

    /// フィールドなしのグループ単独列（出力列 `image` / `score` など）
    pub fn group_only(group: impl Into<String>) -> Self {
        Self::new(group, "")
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.group, self.field)
    }
}
