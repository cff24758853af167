use clap::Parser;
use fundus_score::{batch, cli, config, enhance, error, logging};
use cli::{Cli, Commands};
use config::Config;
use error::Result;
use fundus_score_common::EyeSide;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);
    let explicit = cli.config.as_deref();

    match cli.command {
        Commands::Enhance { folder, output } => {
            println!("🔬 fundus-score - 眼底写真補正\n");

            let config = Config::load(explicit)?;
            let output = output.unwrap_or_else(|| config.paths.enhanced_dir.clone());
            let pipeline = enhance::EnhancePipeline::new(&config.calibration, &config.enhance)?;

            println!("[1/1] 補正中...");
            let summary = enhance::enhance_folder(&folder, &output, &pipeline)?;
            println!("✔ {}/{}枚を補正: {}", summary.enhanced, summary.total, output.display());

            if !summary.failed.is_empty() {
                println!("⚠ 読み込めなかった画像: {}枚", summary.failed.len());
                for name in &summary.failed {
                    println!("  - {}", name);
                }
            }

            println!("\n✅ 補正完了");
        }

        Commands::Score { od_table, os_table, image_dir, output_dir, pre_enhanced } => {
            println!("📊 fundus-score - 混濁スコア算出\n");

            let mut config = Config::load(explicit)?;
            if let Some(path) = od_table {
                config.tables.source_mut(EyeSide::Od).path = path;
            }
            if let Some(path) = os_table {
                config.tables.source_mut(EyeSide::Os).path = path;
            }
            if let Some(dir) = image_dir {
                config.paths.image_dir = dir;
            }
            if let Some(dir) = output_dir {
                config.paths.output_dir = dir;
            }

            println!(
                "[1/1] 処理中...{}",
                if pre_enhanced { " (補正済み画像)" } else { "" }
            );
            let run = batch::run_scoring(&config, pre_enhanced)?;
            let summary = &run.summary;
            println!("✔ {}/{}枚のスコアを記録\n", summary.scored(), summary.total());

            for report in summary
                .reports
                .iter()
                .filter(|r| !matches!(r.outcome, batch::ImageOutcome::Scored { .. }))
            {
                println!("  - {}: {}", report.file_name, report.outcome);
            }

            for path in &run.table_outputs {
                println!("✔ 表を保存: {}", path.display());
            }
            println!("✔ 統合レポート ({}行): {}", run.merged.len(), run.merged_output.display());

            println!("\n✅ 完了");
        }

        Commands::Config { show, init } => {
            // 初期化は読み込みより先（明示パスがまだ存在しなくてよい）
            if init {
                let path = Config::init(explicit)?;
                println!("✔ 設定ファイルを作成: {}", path.display());
            }

            if show || !init {
                let config = Config::load(explicit)?;
                println!("設定:");
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}
