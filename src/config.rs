use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Tool names and fixed flags for every stage, loaded from `toolchain.toml`.
///
/// Each section can be omitted; missing fields fall back to the compiled-in
/// defaults so a partial override file only needs the entries it changes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Toolchain {
    pub compile: CompileTools,
    pub stat: StatTools,
    pub translate: TranslateTools,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompileTools {
    pub cc: String,
    pub wasm_cc: String,
    pub opt_levels: Vec<u8>,
}

impl Default for CompileTools {
    fn default() -> Self {
        Self {
            cc: "clang".to_string(),
            wasm_cc: "emcc".to_string(),
            opt_levels: vec![0, 1, 2, 3],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StatTools {
    pub ctags: String,
}

impl Default for StatTools {
    fn default() -> Self {
        Self {
            ctags: "ctags".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranslateTools {
    pub tool: String,
    pub rules: String,
    pub timeout_secs: u64,
}

impl Default for TranslateTools {
    fn default() -> Self {
        Self {
            tool: "lowa".to_string(),
            rules: "rules.lr".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Toolchain {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("parse toolchain config")
    }

    /// Load from `path`, or the compiled-in `toolchain.toml` when absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)
                    .with_context(|| format!("reading config file: {}", p.display()))?;
                Self::from_toml(&text)
            }
            None => Self::from_toml(crate::DEFAULT_TOOLCHAIN),
        }
    }
}
