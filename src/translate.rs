use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use crossbeam_channel as channel;
use rayon::prelude::*;

use crate::config::Toolchain;
use crate::discover::{self, SourceFile};
use crate::exec::{self, ExecStatus};
use crate::report;

/// One row of the lowering report.
#[derive(Debug, Clone)]
pub struct TranslateRecord {
    pub file: String,
    pub status: ExecStatus,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TranslateTotals {
    pub total: usize,
    pub successes: usize,
    pub failures: usize,
}

#[derive(Debug)]
pub struct TranslateOptions {
    pub root: PathBuf,
    pub output: PathBuf,
    pub report: PathBuf,
    pub timeout_secs: Option<u64>,
    pub progress: bool,
}

/// Lower every WASM binary under the source tree to LLVM IR text at a
/// mirrored output path, with a hard per-invocation timeout. Process output
/// goes to a `.log` file next to the produced IR, never into the report.
pub fn run(toolchain: &Toolchain, opts: &TranslateOptions) -> Result<TranslateTotals> {
    let files = discover::walk_files(&opts.root, &["wasm"])?;
    let timeout = Duration::from_secs(
        opts.timeout_secs
            .unwrap_or(toolchain.translate.timeout_secs),
    );
    // The rule file is resolved up front: the tool runs with its cwd set to
    // the output directory, where a relative rule path would not resolve.
    let rules = fs::canonicalize(&toolchain.translate.rules)
        .unwrap_or_else(|_| PathBuf::from(&toolchain.translate.rules));

    let bar = crate::progress_bar(opts.progress, files.len() as u64);

    let (tx, rx) = channel::bounded::<TranslateRecord>(1024);
    let aggregator = std::thread::spawn(move || {
        let mut records = Vec::new();
        let mut totals = TranslateTotals::default();
        for record in rx.iter() {
            totals.total += 1;
            if record.status.success() {
                totals.successes += 1;
            } else {
                totals.failures += 1;
            }
            records.push(record);
        }
        (records, totals)
    });

    files.par_iter().for_each_with(tx.clone(), |tx, file| {
        let record = translate_one(toolchain, opts, &rules, timeout, file);
        if let Some(pb) = &bar {
            pb.inc(1);
            pb.set_message(file.rel.display().to_string());
        }
        let _ = tx.send(record);
    });
    drop(tx);

    let Ok((mut records, totals)) = aggregator.join() else {
        bail!("aggregator thread panicked");
    };
    if let Some(pb) = &bar {
        pb.finish_and_clear();
    }

    records.sort_by(|a, b| discover::natural_cmp(&a.file, &b.file));
    report::write_translate_report(&opts.report, &records)
        .with_context(|| format!("writing {}", opts.report.display()))?;
    println!("Stats saved to {}", opts.report.display());
    println!(
        "Total: {}, Success: {}, Fail: {}",
        totals.total, totals.successes, totals.failures
    );
    Ok(totals)
}

fn translate_one(
    toolchain: &Toolchain,
    opts: &TranslateOptions,
    rules: &Path,
    timeout: Duration,
    file: &SourceFile,
) -> TranslateRecord {
    let rel = file.rel.display().to_string();
    let ll_path = opts.output.join(file.rel.with_extension("ll"));
    let log_path = opts.output.join(file.rel.with_extension("log"));

    let out_dir = ll_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();
    if let Err(err) = fs::create_dir_all(&out_dir) {
        eprintln!("create {}: {err}", out_dir.display());
        return TranslateRecord {
            file: rel,
            status: ExecStatus::Exit(-1),
            elapsed: Duration::ZERO,
        };
    }

    // Absolute input path, bare filename for the output: the tool names its
    // products relative to its working directory.
    let wasm_abs = fs::canonicalize(&file.path).unwrap_or_else(|_| file.path.clone());
    let ll_name = ll_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let args = vec![
        "-i".to_string(),
        wasm_abs.to_string_lossy().into_owned(),
        "-O".to_string(),
        format!("-r={}", rules.display()),
        "-o".to_string(),
        ll_name,
    ];

    let (status, output, elapsed) =
        match exec::run_with_timeout(&toolchain.translate.tool, &args, &out_dir, timeout) {
            Ok(out) => (out.status, out.combined(), out.elapsed),
            Err(err) => {
                eprintln!("translate {}: {err:#}", file.rel.display());
                (ExecStatus::Exit(-1), format!("{err:#}"), Duration::ZERO)
            }
        };
    if let Err(err) = fs::write(&log_path, &output) {
        eprintln!("write {}: {err}", log_path.display());
    }

    TranslateRecord {
        file: rel,
        status,
        elapsed,
    }
}
