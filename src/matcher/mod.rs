//! 患者レコードの照合
//!
//! 眼別の表を `Dataset` として包み、正規化した患者IDで一意の行を探す。
//! 0件・複数件は照合失敗（レコードは変更しない）。

use crate::config::TableLayout;
use crate::error::Result;
use fundus_score_common::{normalize_id, Cell, ColumnKey, EyeSide, ScoreRow, Table};

/// 照合結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordMatch {
    Unique(usize),
    NotFound,
    /// 一致した行数
    Ambiguous(usize),
}

/// 眼別データセットで使う列
#[derive(Debug, Clone)]
pub struct DatasetColumns {
    pub id: ColumnKey,
    pub axial_length: ColumnKey,
    pub image: ColumnKey,
    pub score: ColumnKey,
}

impl DatasetColumns {
    pub fn from_layout(layout: &TableLayout, side: EyeSide) -> Self {
        Self {
            id: layout.source(side).id_column.clone(),
            axial_length: layout.axial_length_column.clone(),
            image: layout.image_column.clone(),
            score: layout.score_column.clone(),
        }
    }
}

/// 眼別の患者表
#[derive(Debug, Clone)]
pub struct Dataset {
    eye_side: EyeSide,
    table: Table,
    columns: DatasetColumns,
}

impl Dataset {
    /// 表を包み、出力列（画像名・スコア）を初期化する
    ///
    /// ID列・眼軸長列がなければエラー。出力列は既存でも "" / 0.0 に戻すので、
    /// 前回の出力表を入力にしても結果は同じになる。
    pub fn new(eye_side: EyeSide, mut table: Table, columns: DatasetColumns) -> Result<Self> {
        table.get_column(&columns.id)?;
        table.get_column(&columns.axial_length)?;

        table.ensure_column(&columns.image);
        table.ensure_column(&columns.score);
        table.fill_column(&columns.image, Cell::Text(String::new()))?;
        table.fill_column(&columns.score, Cell::Number(0.0))?;

        Ok(Self {
            eye_side,
            table,
            columns,
        })
    }

    pub fn eye_side(&self) -> EyeSide {
        self.eye_side
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// 患者IDで行を照合
    pub fn match_record(&self, patient_id: &str) -> RecordMatch {
        let rows = self
            .table
            .find_rows(&self.columns.id, |cell| cell_id(cell).as_deref() == Some(patient_id))
            .unwrap_or_default();

        match rows.as_slice() {
            [] => RecordMatch::NotFound,
            [row] => RecordMatch::Unique(*row),
            _ => RecordMatch::Ambiguous(rows.len()),
        }
    }

    /// 眼軸長（空欄・数値でない場合は None = 未定義）
    pub fn axial_length(&self, row: usize) -> Option<f64> {
        self.table
            .get_cell(row, &self.columns.axial_length)
            .ok()
            .and_then(Cell::as_f64)
            .filter(|v| !v.is_nan())
    }

    /// 画像名とスコアを書き込む（同じ入力なら何度実行しても同じ結果）
    pub fn assign(&mut self, row: usize, image_name: &str, score: f64) -> Result<()> {
        self.table.set_cell(row, &self.columns.image, image_name)?;
        self.table.set_cell(row, &self.columns.score, score)?;
        Ok(())
    }

    pub fn image_name(&self, row: usize) -> Option<&str> {
        self.table
            .get_cell(row, &self.columns.image)
            .ok()
            .and_then(Cell::as_str)
    }

    /// 全行の (画像名, スコア)（行順、画像名が空の行も含む）
    pub fn score_rows(&self) -> Vec<ScoreRow> {
        let images = self.table.get_column(&self.columns.image).unwrap_or_default();
        let scores = self.table.get_column(&self.columns.score).unwrap_or_default();

        images
            .into_iter()
            .zip(scores)
            .map(|(image, score)| ScoreRow {
                image: image.to_string(),
                score: score.as_f64().unwrap_or(0.0),
            })
            .collect()
    }

    pub fn into_table(self) -> Table {
        self.table
    }
}

/// IDセルを比較用の文字列に正規化
fn cell_id(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Number(n) if n.fract() == 0.0 && *n >= 0.0 => normalize_id(&format!("{}", *n as u64)),
        Cell::Text(s) => normalize_id(s),
        _ => None,
    }
}
