use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::discover::{self, SourceFile};

/// Headers prepended to every sample so the common libc calls resolve.
pub const HEADER_BLOCK: &str = "#include <stdio.h>\n#include <string.h>\n#include <math.h>\n#include <stdlib.h>\n#include <limits.h>\n#include <stdbool.h>\n\n";

// Applied in this exact order over the whole buffer. The fourth rule turns an
// already-fixed `int main()` into `int int main()`; the fifth collapses it.
const MAIN_REWRITES: &[(&str, &str)] = &[
    ("void main", "int main"),
    ("double main", "int main"),
    ("char main", "int main"),
    ("main()", "int main()"),
    ("int int main()", "int main()"),
];

/// Rewrite the known non-standard `main` declarations. Purely textual: a
/// string literal or comment containing one of the patterns is rewritten too,
/// and multiple `main`-like declarations all get touched.
pub fn rewrite_main(code: &str) -> String {
    let mut code = code.to_string();
    for (from, to) in MAIN_REWRITES {
        code = code.replace(from, to);
    }
    code
}

/// Wrap one raw sample into a compilable translation unit. Not idempotent:
/// feeding an already-normalized file through again duplicates the header
/// block, since no presence check is performed.
pub fn normalize_source(raw: &str) -> String {
    format!("{HEADER_BLOCK}{}", rewrite_main(raw))
}

#[derive(Debug)]
pub struct NormalizeOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub ext: String,
    pub progress: bool,
}

#[derive(Debug)]
pub struct NormalizeSummary {
    pub discovered: usize,
    pub written: usize,
}

/// Walk the raw sample tree and write one `.c` file per sample into a
/// mirrored output tree.
pub fn run(opts: &NormalizeOptions) -> Result<NormalizeSummary> {
    let files = discover::walk_files(&opts.input, &[opts.ext.as_str()])?;
    let bar = crate::progress_bar(opts.progress, files.len() as u64);

    let written = AtomicUsize::new(0);
    files.par_iter().for_each(|file| {
        match normalize_file(file, &opts.output) {
            Ok(()) => {
                written.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => eprintln!("normalize {}: {err:#}", file.rel.display()),
        }
        if let Some(pb) = &bar {
            pb.inc(1);
            pb.set_message(file.rel.display().to_string());
        }
    });
    if let Some(pb) = &bar {
        pb.finish_and_clear();
    }

    let summary = NormalizeSummary {
        discovered: files.len(),
        written: written.into_inner(),
    };
    println!(
        "normalized {}/{} samples into {}",
        summary.written,
        summary.discovered,
        opts.output.display()
    );
    Ok(summary)
}

fn normalize_file(file: &SourceFile, out_root: &Path) -> Result<()> {
    // Samples are not reliably UTF-8; undecodable bytes are replaced rather
    // than failing the file.
    let bytes = fs::read(&file.path).with_context(|| format!("read {}", file.path.display()))?;
    let code = String::from_utf8_lossy(&bytes);

    let out_path = out_root.join(file.rel.with_extension("c"));
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(&out_path, normalize_source(&code))
        .with_context(|| format!("write {}", out_path.display()))
}
