use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use crossbeam_channel as channel;
use rayon::prelude::*;

use crate::classify;
use crate::config::Toolchain;
use crate::discover::{self, SourceFile};
use crate::exec;
use crate::report;

/// What the compiler is asked to produce for one (source, level) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Textual LLVM IR via the C compiler.
    Ir,
    /// WebAssembly binary via the cross-compiler.
    Wasm,
}

impl ArtifactKind {
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Ir => "ll",
            ArtifactKind::Wasm => "wasm",
        }
    }
}

/// Report column label for a target, e.g. `.2.wasm`.
pub fn target_label(level: u8, kind: ArtifactKind) -> String {
    format!(".{level}.{}", kind.extension())
}

#[derive(Debug)]
pub struct CompileOptions {
    pub root: PathBuf,
    pub filelist: Option<PathBuf>,
    pub emit: Vec<ArtifactKind>,
    pub native: bool,
    pub report: PathBuf,
    pub progress: bool,
}

/// Everything one worker produces for one source file. All targets of the
/// file run sequentially inside the worker; files never wait on each other.
#[derive(Debug)]
pub struct FileOutcome {
    pub rel: PathBuf,
    /// Directory component of `rel`, the per-directory accounting key.
    pub dir: String,
    /// Whether the file counts as a C program (native probe heuristic).
    pub c_program: bool,
    /// Whether the native probe compiled cleanly.
    pub success: bool,
    /// One diagnostic cell per target column; empty on success.
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub files: usize,
    pub c_programs: usize,
    pub successes: usize,
}

impl Counts {
    fn add(&mut self, outcome: &FileOutcome) {
        self.files += 1;
        self.c_programs += usize::from(outcome.c_program);
        self.successes += usize::from(outcome.success);
    }
}

/// Successes over C-program count; exactly 0 when nothing counted as C.
pub fn success_rate(successes: usize, c_programs: usize) -> f64 {
    if c_programs == 0 {
        0.0
    } else {
        successes as f64 / c_programs as f64
    }
}

#[derive(Debug, Default)]
pub struct Aggregate {
    pub rows: Vec<(String, Vec<String>)>,
    pub dirs: BTreeMap<String, Counts>,
    pub total: Counts,
}

impl Aggregate {
    /// Folding one outcome at a time; counters and sums only, so any
    /// completion order produces the same aggregate.
    pub fn add(&mut self, outcome: FileOutcome) {
        self.dirs.entry(outcome.dir.clone()).or_default().add(&outcome);
        self.total.add(&outcome);
        self.rows
            .push((outcome.rel.to_string_lossy().into_owned(), outcome.cells));
    }
}

/// Compile every discovered (or allow-listed) source at each configured
/// target, then write the per-target diagnostic report and print per-directory
/// and total success accounting.
pub fn run(toolchain: &Toolchain, opts: &CompileOptions) -> Result<Counts> {
    let mut files = discover::walk_files(&opts.root, &["c"])?;
    if let Some(list) = &opts.filelist {
        let allow = discover::read_allow_list(list)?;
        files.retain(|f| allow.contains(&f.rel));
    }

    // Level-major column order, IR before WASM within a level.
    let kinds: Vec<ArtifactKind> = [ArtifactKind::Ir, ArtifactKind::Wasm]
        .into_iter()
        .filter(|k| opts.emit.contains(k))
        .collect();
    let mut targets = Vec::new();
    for &level in &toolchain.compile.opt_levels {
        for &kind in &kinds {
            targets.push((level, kind));
        }
    }
    let labels: Vec<String> = targets.iter().map(|&(l, k)| target_label(l, k)).collect();

    let bar = crate::progress_bar(opts.progress, files.len() as u64);

    let (tx, rx) = channel::bounded::<FileOutcome>(1024);
    let aggregator = std::thread::spawn(move || {
        let mut agg = Aggregate::default();
        for outcome in rx.iter() {
            agg.add(outcome);
        }
        agg
    });

    files.par_iter().for_each_with(tx.clone(), |tx, file| {
        let outcome = compile_one(toolchain, opts, &targets, file);
        if let Some(pb) = &bar {
            pb.inc(1);
            pb.set_message(file.rel.display().to_string());
        }
        let _ = tx.send(outcome);
    });
    drop(tx);

    let Ok(mut agg) = aggregator.join() else {
        bail!("aggregator thread panicked");
    };
    if let Some(pb) = &bar {
        pb.finish_and_clear();
    }

    let mut dirs: Vec<(&String, &Counts)> = agg.dirs.iter().collect();
    dirs.sort_by(|a, b| discover::natural_cmp(a.0, b.0));
    for (dir, counts) in dirs {
        println!(
            "{}\tfile {}\tcprog {}\tsuccess {}\tsuccess_rate {}",
            dir,
            counts.files,
            counts.c_programs,
            counts.successes,
            success_rate(counts.successes, counts.c_programs)
        );
    }
    println!(
        "{}\ttotal_file {}\ttotal_cprog {}\ttotal_success {}\ttotal_success_rate {}",
        opts.root.display(),
        agg.total.files,
        agg.total.c_programs,
        agg.total.successes,
        success_rate(agg.total.successes, agg.total.c_programs)
    );

    agg.rows
        .sort_by(|a, b| discover::natural_cmp(&a.0, &b.0));
    report::write_compile_report(&opts.report, &labels, &agg.rows)
        .with_context(|| format!("writing {}", opts.report.display()))?;
    Ok(agg.total)
}

fn compile_one(
    toolchain: &Toolchain,
    opts: &CompileOptions,
    targets: &[(u8, ArtifactKind)],
    file: &SourceFile,
) -> FileOutcome {
    let work_dir = file
        .path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();
    let name = file
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = file
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = file
        .rel
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut c_program = false;
    let mut success = false;
    if opts.native {
        let args = vec![
            name.clone(),
            "-w".to_string(),
            "-o".to_string(),
            format!("{stem}.out"),
            "-lm".to_string(),
        ];
        match exec::run(&toolchain.compile.cc, &args, &work_dir) {
            Ok(out) if out.success() => {
                c_program = true;
                success = true;
            }
            Ok(out) => {
                if !classify::diagnostics_look_cpp(&out.combined()) {
                    c_program = true;
                }
            }
            Err(err) => eprintln!("compile {}: {err:#}", file.rel.display()),
        }
    }

    let mut cells = Vec::with_capacity(targets.len());
    for &(level, kind) in targets {
        let out_name = format!("{stem}.{level}.{}", kind.extension());
        let (compiler, args) = match kind {
            ArtifactKind::Ir => (
                &toolchain.compile.cc,
                vec![
                    name.clone(),
                    "-w".to_string(),
                    "-S".to_string(),
                    "-emit-llvm".to_string(),
                    format!("-O{level}"),
                    "-o".to_string(),
                    out_name,
                    "-lm".to_string(),
                ],
            ),
            ArtifactKind::Wasm => (
                &toolchain.compile.wasm_cc,
                vec![
                    name.clone(),
                    "-w".to_string(),
                    format!("-O{level}"),
                    "-o".to_string(),
                    out_name,
                    "-lm".to_string(),
                ],
            ),
        };
        let cell = match exec::run(compiler, &args, &work_dir) {
            Ok(out) if out.success() => String::new(),
            Ok(out) => out.combined(),
            Err(err) => format!("{err:#}"),
        };
        cells.push(cell);
    }

    FileOutcome {
        rel: file.rel.clone(),
        dir,
        c_program,
        success,
        cells,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_level_major() {
        assert_eq!(target_label(0, ArtifactKind::Ir), ".0.ll");
        assert_eq!(target_label(3, ArtifactKind::Wasm), ".3.wasm");
    }

    #[test]
    fn zero_denominator_rate_is_zero() {
        assert_eq!(success_rate(0, 0), 0.0);
        assert_eq!(success_rate(5, 0), 0.0);
        assert_eq!(success_rate(1, 2), 0.5);
    }

    fn outcome(dir: &str, name: &str, c: bool, ok: bool) -> FileOutcome {
        FileOutcome {
            rel: PathBuf::from(dir).join(name),
            dir: dir.to_string(),
            c_program: c,
            success: ok,
            cells: vec![String::new()],
        }
    }

    #[test]
    fn aggregation_is_order_independent() {
        let make = || {
            vec![
                outcome("1", "a.c", true, true),
                outcome("1", "b.c", true, false),
                outcome("2", "c.c", false, false),
                outcome("2", "d.c", true, true),
            ]
        };

        let mut forward = Aggregate::default();
        for o in make() {
            forward.add(o);
        }
        let mut backward = Aggregate::default();
        for o in make().into_iter().rev() {
            backward.add(o);
        }

        assert_eq!(forward.total, backward.total);
        assert_eq!(forward.dirs, backward.dirs);
        assert_eq!(forward.total.files, 4);
        assert_eq!(forward.total.c_programs, 3);
        assert_eq!(forward.total.successes, 2);
        assert_eq!(forward.dirs["1"].c_programs, 2);
        assert_eq!(forward.dirs["2"].successes, 1);
    }
}
