use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar for one batch operation; hidden unless `visible`
pub fn batch_progress(len: usize, message: &'static str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{eta}] {bar:40.cyan/blue} {pos}/{len} ({percent}%) {msg}")
    {
        progress.set_style(style.progress_chars("##-"));
    }
    progress.set_message(message);
    progress
}
