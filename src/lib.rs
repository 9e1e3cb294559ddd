pub mod classify;
pub mod compile;
pub mod config;
pub mod discover;
pub mod exec;
pub mod normalize;
pub mod report;
pub mod stat;
pub mod translate;

/// Default toolchain configuration compiled into the binary.
pub const DEFAULT_TOOLCHAIN: &str = include_str!("../toolchain.toml");

use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar shared by all stages; `None` when progress display is off.
pub fn progress_bar(enabled: bool, len: u64) -> Option<ProgressBar> {
    if !enabled {
        return None;
    }
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%, eta {eta}) {msg}",
            )
            .unwrap()
            .progress_chars("#>-"),
    );
    Some(pb)
}
