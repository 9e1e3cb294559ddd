use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;

use crate::classify;
use crate::config::Toolchain;
use crate::discover::{self, SourceFile};
use crate::exec;
use crate::report;

/// Column order of the statistics report.
pub const FIELDS: [&str; 9] = [
    "file",
    "is_cpp",
    "has_struct",
    "has_switch",
    "has_indirect_call",
    "has_scanf",
    "has_printf",
    "line_count",
    "function_count",
];

/// One row of the statistics report, derived from a single source file.
#[derive(Debug, Clone, Serialize)]
pub struct FileStats {
    pub file: String,
    pub is_cpp: bool,
    pub has_struct: bool,
    pub has_switch: bool,
    pub has_indirect_call: bool,
    pub has_scanf: bool,
    pub has_printf: bool,
    pub line_count: usize,
    pub function_count: i64,
}

/// Trailing synthetic row: per boolean field the count of files where it was
/// true, per numeric field the sum, and the file count in the `file` column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatTotals {
    pub files: usize,
    pub is_cpp: usize,
    pub has_struct: usize,
    pub has_switch: usize,
    pub has_indirect_call: usize,
    pub has_scanf: usize,
    pub has_printf: usize,
    pub line_count: u64,
    pub function_count: i64,
}

pub fn summarize(rows: &[FileStats]) -> StatTotals {
    let mut t = StatTotals::default();
    for row in rows {
        t.files += 1;
        t.is_cpp += usize::from(row.is_cpp);
        t.has_struct += usize::from(row.has_struct);
        t.has_switch += usize::from(row.has_switch);
        t.has_indirect_call += usize::from(row.has_indirect_call);
        t.has_scanf += usize::from(row.has_scanf);
        t.has_printf += usize::from(row.has_printf);
        t.line_count += row.line_count as u64;
        t.function_count += row.function_count;
    }
    t
}

/// Static features of one source, plus the externally-counted functions.
pub fn stat_source(rel: &str, code: &str, function_count: i64) -> FileStats {
    FileStats {
        file: rel.to_string(),
        is_cpp: classify::is_cpp_source(code),
        has_struct: classify::has_struct(code),
        has_switch: classify::has_switch(code),
        has_indirect_call: classify::has_indirect_call(code),
        has_scanf: classify::has_scanf(code),
        has_printf: classify::has_printf(code),
        line_count: classify::count_lines(code),
        function_count,
    }
}

/// Count function definitions by tagging the file and counting output lines.
/// Any failure at all, including a missing tagging tool, yields -1.
pub fn count_functions(ctags: &str, path: &Path) -> i64 {
    let args = vec![
        "--c-kinds=f".to_string(),
        "-x".to_string(),
        path.to_string_lossy().into_owned(),
    ];
    match exec::run(ctags, &args, Path::new(".")) {
        Ok(out) if out.success() => out.stdout.trim().lines().count() as i64,
        _ => -1,
    }
}

#[derive(Debug)]
pub struct StatOptions {
    pub root: PathBuf,
    pub output: PathBuf,
    pub progress: bool,
}

/// Walk the normalized tree and write the per-file statistics report.
pub fn run(toolchain: &Toolchain, opts: &StatOptions) -> Result<StatTotals> {
    let files = discover::walk_files(&opts.root, &["c", "cpp"])?;
    let bar = crate::progress_bar(opts.progress, files.len() as u64);

    // par_iter + collect preserves discovery order, so the report rows come
    // out in the same natural order the walk produced.
    let rows: Vec<FileStats> = files
        .par_iter()
        .map(|file| {
            let row = stat_file(toolchain, file);
            if let Some(pb) = &bar {
                pb.inc(1);
                pb.set_message(file.rel.display().to_string());
            }
            row
        })
        .collect();
    if let Some(pb) = &bar {
        pb.finish_and_clear();
    }

    let totals = summarize(&rows);
    report::write_stats_csv(&opts.output, &rows, &totals)
        .with_context(|| format!("writing {}", opts.output.display()))?;
    println!("Statistics written to {}", opts.output.display());

    println!("\nSummary:");
    println!("file: {}", totals.files);
    println!("is_cpp: {}", totals.is_cpp);
    println!("has_struct: {}", totals.has_struct);
    println!("has_switch: {}", totals.has_switch);
    println!("has_indirect_call: {}", totals.has_indirect_call);
    println!("has_scanf: {}", totals.has_scanf);
    println!("has_printf: {}", totals.has_printf);
    println!("line_count: {}", totals.line_count);
    println!("function_count: {}", totals.function_count);
    Ok(totals)
}

fn stat_file(toolchain: &Toolchain, file: &SourceFile) -> FileStats {
    let code = match std::fs::read(&file.path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(err) => {
            eprintln!("read {}: {err}", file.path.display());
            String::new()
        }
    };
    let functions = count_functions(&toolchain.stat.ctags, &file.path);
    stat_source(&file.rel.to_string_lossy(), &code, functions)
}
