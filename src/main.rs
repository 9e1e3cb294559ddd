use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use corpusprep::compile::{self, ArtifactKind, CompileOptions};
use corpusprep::config::Toolchain;
use corpusprep::normalize::{self, NormalizeOptions};
use corpusprep::stat::{self, StatOptions};
use corpusprep::translate::{self, TranslateOptions};

#[derive(Parser)]
#[command(
    name = "corpusprep",
    version,
    about = "Batch preparation pipeline for C program corpora"
)]
struct Cli {
    /// Toolchain config file (defaults to the compiled-in toolchain.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Worker pool size
    #[arg(long, global = true, value_name = "N")]
    threads: Option<usize>,

    /// Show a progress bar
    #[arg(long, global = true)]
    progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wrap raw samples into compilable C translation units
    Normalize {
        /// Tree of raw sample files
        #[arg(short, long)]
        input: PathBuf,

        /// Mirrored output tree of .c files
        #[arg(short, long)]
        output: PathBuf,

        /// Extension of the raw sample files
        #[arg(long, default_value = "txt")]
        ext: String,
    },
    /// Compile each source at every optimization level and backend
    Compile {
        /// Tree of normalized .c sources
        #[arg(short, long)]
        root: PathBuf,

        /// Restrict the run to the relative paths listed in this file
        #[arg(long, value_name = "FILE")]
        filelist: Option<PathBuf>,

        /// Artifact kinds to emit per optimization level
        #[arg(long, value_delimiter = ',', default_values = ["ll", "wasm"])]
        emit: Vec<EmitArg>,

        /// Skip the native compile probe (disables C-program accounting)
        #[arg(long)]
        skip_native: bool,

        /// Aggregate diagnostic report
        #[arg(long, default_value = "compile_report.csv")]
        report: PathBuf,
    },
    /// Collect static feature statistics per source file
    Stat {
        /// Tree of .c/.cpp sources
        #[arg(short, long)]
        root: PathBuf,

        /// Statistics report
        #[arg(short, long, default_value = "stats.csv")]
        output: PathBuf,
    },
    /// Lower compiled WASM binaries to LLVM IR text
    Translate {
        /// Tree of compiled .wasm binaries
        #[arg(short, long)]
        root: PathBuf,

        /// Mirrored output tree of .ll files (with .log siblings)
        #[arg(short, long)]
        output: PathBuf,

        /// Lowering status report
        #[arg(long, default_value = "translate_stats.csv")]
        report: PathBuf,

        /// Override the configured per-invocation timeout
        #[arg(long, value_name = "SECS")]
        timeout_secs: Option<u64>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum EmitArg {
    Ll,
    Wasm,
}

impl From<EmitArg> for ArtifactKind {
    fn from(arg: EmitArg) -> Self {
        match arg {
            EmitArg::Ll => ArtifactKind::Ir,
            EmitArg::Wasm => ArtifactKind::Wasm,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    rayon::ThreadPoolBuilder::new()
        .num_threads(cli.threads.unwrap_or_else(num_cpus::get))
        .build_global()
        .ok();

    let toolchain = Toolchain::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Normalize { input, output, ext } => {
            normalize::run(&NormalizeOptions {
                input,
                output,
                ext,
                progress: cli.progress,
            })?;
        }
        Commands::Compile {
            root,
            filelist,
            emit,
            skip_native,
            report,
        } => {
            compile::run(
                &toolchain,
                &CompileOptions {
                    root,
                    filelist,
                    emit: emit.into_iter().map(ArtifactKind::from).collect(),
                    native: !skip_native,
                    report,
                    progress: cli.progress,
                },
            )?;
        }
        Commands::Stat { root, output } => {
            stat::run(
                &toolchain,
                &StatOptions {
                    root,
                    output,
                    progress: cli.progress,
                },
            )?;
        }
        Commands::Translate {
            root,
            output,
            report,
            timeout_secs,
        } => {
            translate::run(
                &toolchain,
                &TranslateOptions {
                    root,
                    output,
                    report,
                    timeout_secs,
                    progress: cli.progress,
                },
            )?;
        }
    }
    Ok(())
}
