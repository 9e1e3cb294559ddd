//! CSV report serialization.
//!
//! Diagnostic cells routinely carry commas, quotes and newlines, so all
//! writing goes through the `csv` crate; a written report must re-parse into
//! the same rows, including intentionally empty cells.

use std::path::Path;

use anyhow::{Context, Result};

use crate::stat::{FileStats, StatTotals};
use crate::translate::TranslateRecord;

/// Compiler-runner report: `Program` plus one column per target label, cells
/// holding the raw diagnostic text (empty on success or untried target).
pub fn write_compile_report(
    path: &Path,
    labels: &[String],
    rows: &[(String, Vec<String>)],
) -> Result<()> {
    let mut w = csv::Writer::from_path(path)
        .with_context(|| format!("create {}", path.display()))?;
    let mut header = vec!["Program".to_string()];
    header.extend(labels.iter().cloned());
    w.write_record(&header)?;
    for (program, cells) in rows {
        let mut record = vec![program.as_str()];
        record.extend(cells.iter().map(String::as_str));
        w.write_record(&record)?;
    }
    w.flush()?;
    Ok(())
}

/// Statistics report: one serialized row per file plus the synthetic totals
/// row (counts for booleans, sums for numerics, file count in `file`).
pub fn write_stats_csv(path: &Path, rows: &[FileStats], totals: &StatTotals) -> Result<()> {
    let mut w = csv::Writer::from_path(path)
        .with_context(|| format!("create {}", path.display()))?;
    for row in rows {
        w.serialize(row)?;
    }
    if rows.is_empty() {
        // serialize() never ran, so emit the header by hand.
        w.write_record(crate::stat::FIELDS)?;
    }
    w.write_record(&[
        totals.files.to_string(),
        totals.is_cpp.to_string(),
        totals.has_struct.to_string(),
        totals.has_switch.to_string(),
        totals.has_indirect_call.to_string(),
        totals.has_scanf.to_string(),
        totals.has_printf.to_string(),
        totals.line_count.to_string(),
        totals.function_count.to_string(),
    ])?;
    w.flush()?;
    Ok(())
}

/// Translator report: `file, status, elapsed_sec`; `status` is an exit code
/// or the literal `timeout`.
pub fn write_translate_report(path: &Path, records: &[TranslateRecord]) -> Result<()> {
    let mut w = csv::Writer::from_path(path)
        .with_context(|| format!("create {}", path.display()))?;
    w.write_record(["file", "status", "elapsed_sec"])?;
    for r in records {
        w.write_record(&[
            r.file.clone(),
            r.status.to_string(),
            format!("{:.3}", r.elapsed.as_secs_f64()),
        ])?;
    }
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::ExecStatus;
    use std::time::Duration;

    #[test]
    fn compile_report_round_trips_messy_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        let labels = vec![".0.ll".to_string(), ".0.wasm".to_string()];
        let rows = vec![
            (
                "1/10.c".to_string(),
                vec![
                    String::new(),
                    "err: \"x\", line 3\nnote: candidate, here".to_string(),
                ],
            ),
            ("2/3.c".to_string(), vec![String::new(), String::new()]),
        ];
        write_compile_report(&path, &labels, &rows).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(
            reader.headers().unwrap(),
            &csv::StringRecord::from(vec!["Program", ".0.ll", ".0.wasm"])
        );
        let parsed: Vec<(String, Vec<String>)> = reader
            .records()
            .map(|r| {
                let r = r.unwrap();
                (
                    r[0].to_string(),
                    r.iter().skip(1).map(str::to_string).collect(),
                )
            })
            .collect();
        assert_eq!(parsed, rows);
    }

    #[test]
    fn stats_csv_has_header_rows_and_totals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.csv");
        let rows = vec![crate::stat::stat_source("1/2.c", "struct S {};\n", 1)];
        let totals = crate::stat::summarize(&rows);
        write_stats_csv(&path, &rows, &totals).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "file,is_cpp,has_struct,has_switch,has_indirect_call,has_scanf,has_printf,line_count,function_count"
        );
        assert_eq!(lines.next().unwrap(), "1/2.c,true,true,false,false,false,false,1,1");
        assert_eq!(lines.next().unwrap(), "1,0,1,0,0,0,0,1,1");
        assert!(lines.next().is_none());
    }

    #[test]
    fn empty_stats_csv_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.csv");
        write_stats_csv(&path, &[], &StatTotals::default()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("file,is_cpp,"));
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn translate_report_uses_timeout_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("translate.csv");
        let records = vec![
            TranslateRecord {
                file: "1/2.wasm".to_string(),
                status: ExecStatus::Exit(0),
                elapsed: Duration::from_millis(1234),
            },
            TranslateRecord {
                file: "1/3.wasm".to_string(),
                status: ExecStatus::TimedOut,
                elapsed: Duration::from_secs(10),
            },
        ];
        write_translate_report(&path, &records).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "file,status,elapsed_sec");
        assert_eq!(lines[1], "1/2.wasm,0,1.234");
        assert_eq!(lines[2], "1/3.wasm,timeout,10.000");
    }
}
