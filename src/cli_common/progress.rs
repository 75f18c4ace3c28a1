//! Progress indicators for long-running commands

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Bar over the exchanges of a `generate` run
pub fn exchange_progress(total: u64) -> Result<ProgressBar> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .context("Failed to set progress style")?
            .progress_chars("=>-"),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}

pub fn spinner(message: impl Into<String>) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .context("Failed to set progress style")?,
    );
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}
