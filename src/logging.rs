//! ログ初期化
//!
//! `RUST_LOG` が設定されていればそれを優先し、なければ `--verbose` で debug、通常は info。

use tracing_subscriber::EnvFilter;

pub fn init_logging(verbose: bool) {
    let base_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(base_level));

    // 進捗表示と混ざらないよう stderr に出す
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
