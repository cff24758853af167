//! ファイル名からの患者ID抽出
//!
//! `RET<数字><OD|OS>` のパターンを探し、数字部を3桁にゼロ埋めする。
//! 例: `im01-RET029OD.jpg` → (`029`, OD)

use crate::types::{EyeSide, ImageId};
use regex::Regex;

/// ファイル名から (患者ID, 眼別) を抽出
///
/// パターンに一致しない場合は `None`（エラーではない）。
///
/// # Examples
/// ```
/// use fundus_score_common::{extract_id, EyeSide};
///
/// let id = extract_id("RET7OS-x.png").unwrap();
/// assert_eq!(id.patient_id, "007");
/// assert_eq!(id.eye_side, EyeSide::Os);
/// ```
pub fn extract_id(file_name: &str) -> Option<ImageId> {
    lazy_static::lazy_static! {
        static ref ID_RE: Regex = Regex::new(r"RET(\d+)(OD|OS)").unwrap();
    }

    let caps = ID_RE.captures(file_name)?;
    let eye_side = caps[2].parse::<EyeSide>().ok()?;

    Some(ImageId {
        patient_id: zero_pad(&caps[1]),
        eye_side,
    })
}

/// 表のIDセル文字列を比較用に正規化
///
/// - `#` と空白を除去
/// - 数字のみなら3桁にゼロ埋め
/// - 数字以外を含む場合は `None`（どの画像とも一致しない）
pub fn normalize_id(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != '#' && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    Some(zero_pad(&cleaned))
}

fn zero_pad(digits: &str) -> String {
    format!("{:0>3}", digits)
}
