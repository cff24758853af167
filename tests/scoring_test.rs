//! スコア算出バッチの統合テスト
//!
//! 一時フォルダに眼別の表と画像を用意し、`run_scoring` を通しで実行する。

use fundus_score::batch::{self, ImageOutcome};
use fundus_score::config::Config;
use fundus_score::enhance::{load_rgb, EnhancePipeline};
use fundus_score::score;
use fundus_score::table::{TableStore, XlsxStore};
use fundus_score_common::{Cell, ColumnKey, EyeSide, Table};
use image::{Rgb, RgbImage};
use std::path::Path;
use tempfile::tempdir;

fn write_table(path: &Path, rows: &[(&str, f64)]) {
    let mut table = Table::new(vec![
        ColumnKey::new("", "No"),
        ColumnKey::new("", "ID"),
        ColumnKey::new("Axial_Length", "Axial_Length"),
    ]);
    for (i, (id, axial)) in rows.iter().enumerate() {
        table.push_row(vec![((i + 1) as f64).into(), (*id).into(), (*axial).into()]);
    }
    XlsxStore::default().save(&table, path).expect("表の保存に失敗");
}

fn write_image(dir: &Path, name: &str, value: u8) {
    RgbImage::from_fn(250, 250, |x, y| {
        // 中央に明るい円を置いて前景と背景を作る
        let dx = x as i32 - 125;
        let dy = y as i32 - 125;
        if dx * dx + dy * dy < 30 * 30 {
            Rgb([value.saturating_add(80), value.saturating_add(80), value.saturating_add(80)])
        } else {
            Rgb([value, value, value])
        }
    })
    .save(dir.join(name))
    .expect("画像の保存に失敗");
}

/// 一時フォルダ内で完結する設定
fn setup(root: &Path) -> Config {
    let image_dir = root.join("images");
    std::fs::create_dir_all(&image_dir).unwrap();

    let mut config = Config::default();
    config.tables.source_mut(EyeSide::Od).path = root.join("od.xlsx");
    config.tables.source_mut(EyeSide::Os).path = root.join("os.xlsx");
    config.paths.image_dir = image_dir;
    config.paths.output_dir = root.join("out");

    write_table(&root.join("od.xlsx"), &[("#029", 23.4), ("#030", 24.0), ("#031", 25.1)]);
    write_table(&root.join("os.xlsx"), &[("#029", 23.8), ("#030", 24.2)]);
    config
}

fn load_output(config: &Config, side: EyeSide) -> Table {
    XlsxStore::default()
        .load(&config.paths.table_output(side))
        .expect("出力表の読み込みに失敗")
}

fn image_column(table: &Table) -> Vec<String> {
    table
        .get_column(&ColumnKey::group_only("image"))
        .unwrap()
        .into_iter()
        .map(|c| c.as_str().unwrap_or_default().to_string())
        .collect()
}

#[test]
fn test_end_to_end_with_enhancement() {
    let dir = tempdir().unwrap();
    let config = setup(dir.path());
    write_image(&config.paths.image_dir, "im01-RET029OD.png", 110);

    let run = batch::run_scoring(&config, false).expect("バッチ失敗");

    assert_eq!(run.summary.scored(), 1);

    let pipeline = EnhancePipeline::new(&config.calibration, &config.enhance).unwrap();
    let enhanced = pipeline.enhance(&load_rgb(&config.paths.image_dir.join("im01-RET029OD.png")).unwrap());
    let expected = score::score(&enhanced, Some(23.4), &config.score).unwrap();

    let od = load_output(&config, EyeSide::Od);
    assert_eq!(image_column(&od), vec!["im01-RET029OD.png", "", ""]);
    let scores = od.get_column(&ColumnKey::group_only("score")).unwrap();
    let actual = scores[0].as_f64().unwrap();
    assert!((actual - expected).abs() < 1e-9, "{} != {}", actual, expected);
    assert_eq!(scores[1].as_f64(), Some(0.0));

    // 元の列は変更されない
    assert_eq!(
        od.get_cell(0, &ColumnKey::new("", "ID")).unwrap(),
        &Cell::Text("#029".into())
    );

    let os = load_output(&config, EyeSide::Os);
    assert!(image_column(&os).iter().all(String::is_empty));
}

#[test]
fn test_skips_and_merged_report() {
    let dir = tempdir().unwrap();
    let config = setup(dir.path());
    let images = &config.paths.image_dir;
    write_image(images, "a-RET030OD.png", 60);
    write_image(images, "b-RET029OS.png", 90);
    write_image(images, "c-RET030OS.png", 120);
    write_image(images, "d-RET031OD.png", 70);
    write_image(images, "e-RET031OD.png", 80);
    write_image(images, "fundus_0001.png", 100);
    write_image(images, "g-RET777OD.png", 100);

    let run = batch::run_scoring(&config, true).expect("バッチ失敗");
    let summary = &run.summary;

    assert_eq!(summary.total(), 7);
    assert_eq!(summary.scored(), 3);
    assert_eq!(summary.outcome("fundus_0001.png"), Some(&ImageOutcome::IdentifierNotFound));
    assert!(matches!(
        summary.outcome("g-RET777OD.png"),
        Some(ImageOutcome::RecordNotFound { .. })
    ));
    assert!(matches!(
        summary.outcome("d-RET031OD.png"),
        Some(ImageOutcome::RecordAmbiguous { .. })
    ));

    let od = load_output(&config, EyeSide::Od);
    assert_eq!(image_column(&od), vec!["", "a-RET030OD.png", ""]);
    let os = load_output(&config, EyeSide::Os);
    assert_eq!(image_column(&os), vec!["b-RET029OS.png", "c-RET030OS.png"]);

    // OD → OS の順で連結
    let names: Vec<_> = run.merged.iter().map(|r| r.image.as_str()).collect();
    assert_eq!(names, vec!["a-RET030OD.png", "b-RET029OS.png", "c-RET030OS.png"]);

    let csv = std::fs::read_to_string(&run.merged_output).unwrap();
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "image,score");
    assert!(lines[1].starts_with("a-RET030OD.png,"));
}

#[test]
fn test_rerun_on_output_is_idempotent() {
    let dir = tempdir().unwrap();
    let mut config = setup(dir.path());
    write_image(&config.paths.image_dir, "RET029OD.png", 100);
    write_image(&config.paths.image_dir, "RET030OS.png", 140);

    let first = batch::run_scoring(&config, true).unwrap();
    let first_od = load_output(&config, EyeSide::Od);
    let first_os = load_output(&config, EyeSide::Os);

    // 出力を入力にしてもう一度実行
    let rerun_dir = dir.path().join("rerun");
    std::fs::create_dir_all(&rerun_dir).unwrap();
    for side in EyeSide::ALL {
        let copy = rerun_dir.join(format!("{}.xlsx", side.code()));
        std::fs::copy(config.paths.table_output(side), &copy).unwrap();
        config.tables.source_mut(side).path = copy;
    }
    config.paths.output_dir = dir.path().join("out2");

    let second = batch::run_scoring(&config, true).unwrap();

    assert_eq!(load_output(&config, EyeSide::Od), first_od);
    assert_eq!(load_output(&config, EyeSide::Os), first_os);
    assert_eq!(second.merged, first.merged);
}

#[test]
fn test_missing_table_is_fatal() {
    let dir = tempdir().unwrap();
    let mut config = setup(dir.path());
    config.tables.source_mut(EyeSide::Os).path = dir.path().join("missing.xlsx");

    let result = batch::run_scoring(&config, true);

    assert!(result.is_err());
    assert!(!config.paths.merged_output_path().exists());
}
