//! 統合レポート
//!
//! 眼別の表から画像が割り当てられた行の (画像名, スコア) を取り出し、
//! 表ごとの行順を保ったまま連結して連番を振り直す。

use serde::Serialize;

/// 眼別表から取り出した1行
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRow {
    pub image: String,
    pub score: f64,
}

/// 統合レポートの1行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRow {
    #[serde(skip)]
    pub index: usize,
    pub image: String,
    pub score: f64,
}

/// 複数表の行を連結（先頭の表から順に、画像名が空の行は除外）
pub fn merge_score_rows<I>(tables: I) -> Vec<MergedRow>
where
    I: IntoIterator,
    I::Item: IntoIterator<Item = ScoreRow>,
{
    tables
        .into_iter()
        .flatten()
        .filter(|row| !row.image.is_empty())
        .enumerate()
        .map(|(index, row)| MergedRow {
            index,
            image: row.image,
            score: row.score,
        })
        .collect()
}
