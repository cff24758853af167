use indicatif::{ProgressBar, ProgressStyle};

/// バッチ処理用の進捗バー（端末でなければ表示されない）
pub fn new_bar(len: u64, message: &'static str) -> ProgressBar {
    let style = ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");

    let bar = ProgressBar::new(len);
    bar.set_style(style);
    bar.set_message(message);
    bar
}
