//! 表データモデル
//!
//! スプレッドシートから読み込んだ行列を (グループ, フィールド) の列キーで扱う。
//! 読み書き自体は呼び出し側のストア実装が担当する。

use crate::error::{Error, Result};
use crate::types::ColumnKey;
use std::fmt;

/// セル値
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// 数値として解釈（数値文字列も可）
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
            Cell::Empty => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            // 整数値は小数点なしで表示
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Cell::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

/// 列キー付きの表
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<ColumnKey>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<ColumnKey>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// 行を追加（列数に合わせて切り詰め・空セル補完）
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Empty);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[ColumnKey] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, key: &ColumnKey) -> Option<usize> {
        self.columns.iter().position(|c| c == key)
    }

    /// 列を取得（行順）
    pub fn get_column(&self, key: &ColumnKey) -> Result<Vec<&Cell>> {
        let col = self.require_column(key)?;
        Ok(self.rows.iter().map(|row| &row[col]).collect())
    }

    /// 条件に一致する行インデックスを行順で返す
    pub fn find_rows<F>(&self, key: &ColumnKey, predicate: F) -> Result<Vec<usize>>
    where
        F: Fn(&Cell) -> bool,
    {
        let col = self.require_column(key)?;
        Ok(self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| predicate(&row[col]))
            .map(|(i, _)| i)
            .collect())
    }

    pub fn get_cell(&self, row: usize, key: &ColumnKey) -> Result<&Cell> {
        let col = self.require_column(key)?;
        self.rows
            .get(row)
            .map(|r| &r[col])
            .ok_or(Error::RowOutOfRange(row))
    }

    pub fn set_cell(&mut self, row: usize, key: &ColumnKey, value: impl Into<Cell>) -> Result<()> {
        let col = self.require_column(key)?;
        let target = self
            .rows
            .get_mut(row)
            .ok_or(Error::RowOutOfRange(row))?;
        target[col] = value.into();
        Ok(())
    }

    /// 列がなければ末尾に追加し、その列インデックスを返す
    pub fn ensure_column(&mut self, key: &ColumnKey) -> usize {
        if let Some(col) = self.column_index(key) {
            return col;
        }
        self.columns.push(key.clone());
        for row in &mut self.rows {
            row.push(Cell::Empty);
        }
        self.columns.len() - 1
    }

    /// 全行の列値を同じ値で埋める
    pub fn fill_column(&mut self, key: &ColumnKey, value: Cell) -> Result<()> {
        let col = self.require_column(key)?;
        for row in &mut self.rows {
            row[col] = value.clone();
        }
        Ok(())
    }

    fn require_column(&self, key: &ColumnKey) -> Result<usize> {
        self.column_index(key)
            .ok_or_else(|| Error::ColumnNotFound(key.to_string()))
    }
}
