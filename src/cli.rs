use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fundus-score")]
#[command(about = "眼底写真の補正・混濁スコア算出ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 設定ファイル（省略時は ~/.config/fundus-score/config.json）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// フォルダ内の眼底写真を補正して保存
    Enhance {
        /// 眼底写真フォルダのパス
        #[arg(required = true)]
        folder: PathBuf,

        /// 出力フォルダ（デフォルト: 設定の enhanced_dir）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 補正・スコア算出・表への書き戻しを一括実行
    Score {
        /// 右眼（OD）の表
        #[arg(long)]
        od_table: Option<PathBuf>,

        /// 左眼（OS）の表
        #[arg(long)]
        os_table: Option<PathBuf>,

        /// 眼底写真フォルダ
        #[arg(short, long)]
        image_dir: Option<PathBuf>,

        /// 出力フォルダ
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// 補正済み画像として扱う（補正をスキップ）
        #[arg(long)]
        pre_enhanced: bool,
    },

    /// 設定を表示/初期化
    Config {
        /// 設定を表示
        #[arg(long)]
        show: bool,

        /// デフォルト設定をファイルに書き出す
        #[arg(long)]
        init: bool,
    },
}
