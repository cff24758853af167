//! Excel ストア
//!
//! 読み込みは calamine、書き出しは共通ライブラリの excel_core（rust_xlsxwriter）。

use super::TableStore;
use crate::error::{FundusError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use fundus_score_common::export::generate_table_buffer;
use fundus_score_common::{Cell, ColumnKey, Table};
use std::path::Path;

/// 先頭シートを読み書きする Excel ストア
#[derive(Debug, Clone, Copy)]
pub struct XlsxStore {
    /// true なら1行目をグループ、2行目をフィールドとする2段ヘッダー
    pub multi_level_header: bool,
}

impl Default for XlsxStore {
    fn default() -> Self {
        Self {
            multi_level_header: true,
        }
    }
}

impl TableStore for XlsxStore {
    fn load(&self, path: &Path) -> Result<Table> {
        if !path.exists() {
            return Err(FundusError::FileNotFound(path.display().to_string()));
        }

        let mut workbook = open_workbook_auto(path)
            .map_err(|e| FundusError::TableLoad(format!("{}: {}", path.display(), e)))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| FundusError::TableLoad(format!("{}: シートがありません", path.display())))?
            .map_err(|e| FundusError::TableLoad(format!("{}: {}", path.display(), e)))?;

        let width = range.width();
        let mut rows = range.rows();

        let columns = if self.multi_level_header {
            let groups = rows.next().unwrap_or(&[]);
            let fields = rows.next().unwrap_or(&[]);
            multi_level_columns(groups, fields, width)
        } else {
            let fields = rows.next().unwrap_or(&[]);
            (0..width)
                .map(|i| ColumnKey::new("", fields.get(i).map(header_text).unwrap_or_default()))
                .collect()
        };

        let mut table = Table::new(columns);
        for row in rows {
            let cells: Vec<Cell> = row.iter().map(to_cell).collect();
            // 空行は読み飛ばす
            if cells.iter().all(Cell::is_empty) {
                continue;
            }
            table.push_row(cells);
        }

        Ok(table)
    }

    fn save(&self, table: &Table, path: &Path) -> Result<()> {
        let buffer = generate_table_buffer(table, self.multi_level_header)
            .map_err(FundusError::ExcelGeneration)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, buffer)?;
        Ok(())
    }
}

/// 2段ヘッダーから列キーを作る
///
/// 結合セルのグループ名は先頭セルにしか入らないので、空欄は直前のグループで埋める。
/// 最初のグループより左の空欄は空文字列のまま。
fn multi_level_columns(groups: &[Data], fields: &[Data], width: usize) -> Vec<ColumnKey> {
    let mut current_group = String::new();
    (0..width)
        .map(|i| {
            let group = groups.get(i).map(header_text).unwrap_or_default();
            if !group.is_empty() {
                current_group = group;
            }
            let field = fields.get(i).map(header_text).unwrap_or_default();
            ColumnKey::new(current_group.clone(), field)
        })
        .collect()
}

fn header_text(data: &Data) -> String {
    match data {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) => Cell::Text(s.clone()),
        other => Cell::Text(other.to_string()),
    }
}
