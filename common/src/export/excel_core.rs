//! Excel生成（共通ライブラリ）
//!
//! Table を2段（またはフラットな1段）ヘッダー付きのワークシートとしてバッファに書き出す

use crate::table::{Cell, Table};
use rust_xlsxwriter::*;

/// Excelをバッファに生成
///
/// # Arguments
/// * `table` - 書き出す表
/// * `multi_level_header` - true ならグループ行とフィールド行の2段ヘッダー
pub fn generate_table_buffer(table: &Table, multi_level_header: bool) -> Result<Vec<u8>, String> {
    let mut workbook = Workbook::new();

    let header_format = Format::new()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_border(FormatBorder::Thin);

    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name("Sheet1")
        .map_err(|e| format!("シート名設定エラー: {}", e))?;

    let header_rows: u32 = if multi_level_header { 2 } else { 1 };

    for (i, key) in table.columns().iter().enumerate() {
        let col = column_number(i)?;
        if multi_level_header {
            write_header(worksheet, 0, col, &key.group, &header_format)?;
            write_header(worksheet, 1, col, &key.field, &header_format)?;
        } else {
            // フラット表はフィールド名、なければグループ名を見出しにする
            let label = if key.field.is_empty() { &key.group } else { &key.field };
            write_header(worksheet, 0, col, label, &header_format)?;
        }
    }

    for (r, row) in table.rows().iter().enumerate() {
        let row_num = header_rows + r as u32;
        for (c, cell) in row.iter().enumerate() {
            let col = column_number(c)?;
            match cell {
                Cell::Empty => {}
                Cell::Text(s) if s.is_empty() => {}
                Cell::Text(s) => {
                    worksheet
                        .write_string(row_num, col, s)
                        .map_err(|e| format!("値書き込みエラー: {}", e))?;
                }
                Cell::Number(n) => {
                    worksheet
                        .write_number(row_num, col, *n)
                        .map_err(|e| format!("値書き込みエラー: {}", e))?;
                }
            }
        }
    }

    workbook
        .save_to_buffer()
        .map_err(|e| format!("Excel保存エラー: {}", e))
}

fn write_header(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    text: &str,
    format: &Format,
) -> Result<(), String> {
    let result = if text.is_empty() {
        worksheet.write_blank(row, col, format)
    } else {
        worksheet.write_string_with_format(row, col, text, format)
    };
    result
        .map(|_| ())
        .map_err(|e| format!("ヘッダー書き込みエラー: {}", e))
}

fn column_number(index: usize) -> Result<u16, String> {
    u16::try_from(index).map_err(|_| format!("列数が多すぎます: {}", index + 1))
}
