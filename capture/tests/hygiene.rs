//! Hygiene — enforces coding standards at test time
//!
//! Scans the capture crate source tree for antipatterns. Each pattern has a
//! budget (ideally zero); the budget never grows.

use std::fs;
use std::path::Path;

/// `(pattern, budget, why it is banned)`.
const BUDGETS: &[(&str, usize, &str)] = &[
    (".unwrap()", 0, "panics"),
    (".expect(", 0, "panics"),
    ("panic!(", 0, "panics"),
    ("unreachable!(", 0, "panics"),
    ("todo!(", 0, "unfinished stub"),
    ("unimplemented!(", 0, "unfinished stub"),
    ("let _ =", 0, "silently discards a value"),
    (".ok()", 0, "silently discards an error"),
    ("#[allow(dead_code)]", 0, "hides dead code"),
    ("println!(", 0, "bypasses tracing"),
    ("std::thread::sleep", 0, "blocks the async runtime"),
    ("block_on(", 0, "blocks the async runtime"),
];

struct SourceFile {
    path: String,
    content: String,
}

/// Production `.rs` files under `src/`, excluding `*_test.rs`.
fn source_files() -> Vec<SourceFile> {
    let mut files = Vec::new();
    collect_rs_files(Path::new("src"), &mut files);
    files
}

fn collect_rs_files(dir: &Path, out: &mut Vec<SourceFile>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_rs_files(&path, out);
            continue;
        }
        let path_str = path.to_string_lossy().to_string();
        if !path_str.ends_with(".rs") || path_str.ends_with("_test.rs") {
            continue;
        }
        if let Ok(content) = fs::read_to_string(&path) {
            out.push(SourceFile { path: path_str, content });
        }
    }
}

fn hits_for(files: &[SourceFile], pattern: &str) -> Vec<(String, usize)> {
    files
        .iter()
        .filter_map(|file| {
            let count = file.content.lines().filter(|line| line.contains(pattern)).count();
            (count > 0).then(|| (file.path.clone(), count))
        })
        .collect()
}

#[test]
fn source_tree_is_scanned() {
    assert!(!source_files().is_empty(), "no sources found under src/");
}

#[test]
fn antipattern_budgets() {
    let files = source_files();
    let mut report = Vec::new();
    for &(pattern, budget, why) in BUDGETS {
        let hits = hits_for(&files, pattern);
        let count: usize = hits.iter().map(|(_, c)| c).sum();
        if count > budget {
            report.push(format!("`{pattern}` ({why}): found {count}, max {budget}"));
            report.extend(hits.iter().map(|(path, c)| format!("  {path}: {c}")));
        }
    }
    assert!(report.is_empty(), "hygiene budgets exceeded:\n{}", report.join("\n"));
}
