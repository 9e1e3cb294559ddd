use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ignore::WalkBuilder;

/// One discovered input file: its on-disk path and its path relative to the
/// walked root. The relative path is the identity used in reports and
/// allow-lists.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub rel: PathBuf,
}

/// Recursively collect files under `root` whose extension is one of `exts`,
/// in natural (numeric-aware) order of their relative path.
pub fn walk_files(root: &Path, exts: &[&str]) -> Result<Vec<SourceFile>> {
    if !root.is_dir() {
        anyhow::bail!("input directory not found: {}", root.display());
    }
    let mut files = Vec::new();
    let mut builder = WalkBuilder::new(root);
    // Dataset trees are plain data, not checkouts: no ignore-file semantics.
    builder.standard_filters(false).follow_links(false);
    for entry in builder.build() {
        match entry {
            Ok(e) if e.file_type().map(|t| t.is_file()).unwrap_or(false) => {
                let path = e.into_path();
                let ext = path
                    .extension()
                    .and_then(|x| x.to_str())
                    .unwrap_or("")
                    .to_ascii_lowercase();
                if exts.contains(&ext.as_str()) {
                    let rel = path
                        .strip_prefix(root)
                        .unwrap_or(path.as_path())
                        .to_path_buf();
                    files.push(SourceFile { path, rel });
                }
            }
            Ok(_) => {}
            Err(err) => eprintln!("walk error: {err}"),
        }
    }
    files.sort_by(|a, b| natural_cmp(&a.rel.to_string_lossy(), &b.rel.to_string_lossy()));
    Ok(files)
}

/// Read an allow-list file: one relative path per non-empty line.
pub fn read_allow_list(path: &Path) -> Result<HashSet<PathBuf>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading allow-list: {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(PathBuf::from)
        .collect())
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum NaturalToken {
    Num(u128),
    Text(String),
}

fn natural_key(s: &str) -> Vec<NaturalToken> {
    let mut tokens = Vec::new();
    let mut buf = String::new();
    let mut in_digits = false;
    for ch in s.chars() {
        if ch.is_ascii_digit() != in_digits && !buf.is_empty() {
            tokens.push(flush_token(&mut buf, in_digits));
        }
        in_digits = ch.is_ascii_digit();
        buf.push(ch);
    }
    if !buf.is_empty() {
        tokens.push(flush_token(&mut buf, in_digits));
    }
    tokens
}

fn flush_token(buf: &mut String, digits: bool) -> NaturalToken {
    let token = if digits {
        match buf.parse::<u128>() {
            Ok(n) => NaturalToken::Num(n),
            Err(_) => NaturalToken::Text(buf.to_ascii_lowercase()),
        }
    } else {
        NaturalToken::Text(buf.to_ascii_lowercase())
    };
    buf.clear();
    token
}

/// Order strings so that embedded numbers compare by value: `f9` < `f10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_key(a).cmp(&natural_key(b))
}
