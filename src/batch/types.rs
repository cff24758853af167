use crate::score::ScoreError;
use fundus_score_common::EyeSide;
use std::fmt;

/// 照合が曖昧になった理由
#[derive(Debug, Clone, PartialEq)]
pub enum Ambiguity {
    /// 表の中で同じIDの行が複数ある
    Rows(usize),
    /// 複数の画像が同じ行を指している
    Images(usize),
}

/// 画像1枚の処理結果
#[derive(Debug, Clone, PartialEq)]
pub enum ImageOutcome {
    Scored {
        eye_side: EyeSide,
        row: usize,
        score: f64,
    },
    DecodeFailed(String),
    IdentifierNotFound,
    /// 対応する眼別の表がない
    SideMismatch(EyeSide),
    RecordNotFound {
        eye_side: EyeSide,
        patient_id: String,
    },
    RecordAmbiguous {
        eye_side: EyeSide,
        patient_id: String,
        reason: Ambiguity,
    },
    Unscoreable(ScoreError),
}

impl fmt::Display for ImageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageOutcome::Scored { eye_side, row, score } => {
                write!(f, "{} 表の {} 行目にスコア {:.4} を記録", eye_side, row, score)
            }
            ImageOutcome::DecodeFailed(e) => write!(f, "画像を読み込めません: {}", e),
            ImageOutcome::IdentifierNotFound => write!(f, "ファイル名から患者IDを抽出できません"),
            ImageOutcome::SideMismatch(side) => write!(f, "{} の表がありません", side),
            ImageOutcome::RecordNotFound { eye_side, patient_id } => {
                write!(f, "{} 表に ID {} の行がありません", eye_side, patient_id)
            }
            ImageOutcome::RecordAmbiguous { eye_side, patient_id, reason } => match reason {
                Ambiguity::Rows(n) => {
                    write!(f, "{} 表に ID {} の行が {} 件あります", eye_side, patient_id, n)
                }
                Ambiguity::Images(n) => {
                    write!(f, "{} 表の ID {} に {} 枚の画像が対応しています", eye_side, patient_id, n)
                }
            },
            ImageOutcome::Unscoreable(e) => write!(f, "スコアを算出できません: {}", e),
        }
    }
}

/// 画像ごとの結果
#[derive(Debug, Clone)]
pub struct ImageReport {
    pub file_name: String,
    pub outcome: ImageOutcome,
}

/// バッチ全体の集計（ファイル名順）
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub reports: Vec<ImageReport>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.reports.len()
    }

    pub fn scored(&self) -> usize {
        self.count(|o| matches!(o, ImageOutcome::Scored { .. }))
    }

    /// スキップされた画像（記録されなかった画像）
    pub fn skipped(&self) -> usize {
        self.total() - self.scored()
    }

    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&ImageOutcome) -> bool,
    {
        self.reports.iter().filter(|r| predicate(&r.outcome)).count()
    }

    pub fn outcome(&self, file_name: &str) -> Option<&ImageOutcome> {
        self.reports
            .iter()
            .find(|r| r.file_name == file_name)
            .map(|r| &r.outcome)
    }
}
