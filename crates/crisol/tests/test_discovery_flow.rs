use std::fs;

use crisol::{config::Config, discover_entry_points, merge_entry, MergeError};
use tempfile::TempDir;

fn write_project(files: &[(&str, &str)]) -> TempDir {
    let temp = TempDir::new().unwrap();
    for (name, code) in files {
        fs::write(temp.path().join(name), code).unwrap();
    }
    temp
}

#[test]
fn test_discovered_entry_merges_cleanly() {
    let temp = write_project(&[
        (
            "tool.py",
            "from lib import run\nif __name__ == \"__main__\":\n    run()\n",
        ),
        ("lib.py", "def run():\n    return 1\n"),
    ]);

    let report = discover_entry_points(temp.path()).unwrap();
    assert_eq!(report.entry_files.len(), 1, "exactly one runnable file");
    let entry = &report.entry_files[0];
    assert!(entry.ends_with("tool.py"));

    let merged = merge_entry(entry, Config::default()).unwrap();
    assert!(merged.contains("def run"), "got:\n{merged}");
    assert!(!merged.contains("from lib import"), "got:\n{merged}");
}

#[test]
fn test_discovery_surfaces_cycles_before_any_merge() {
    let temp = write_project(&[
        (
            "main.py",
            "import a\nif __name__ == \"__main__\":\n    a.go()\n",
        ),
        ("a.py", "import b\ndef go():\n    pass\n"),
        ("b.py", "import a\n"),
    ]);

    let err = discover_entry_points(temp.path()).unwrap_err();
    match err {
        MergeError::UnresolvedCycle { mut modules } => {
            modules.sort();
            assert_eq!(modules, vec!["a", "b"]);
        }
        other => panic!("expected UnresolvedCycle, got {other:?}"),
    }
}
