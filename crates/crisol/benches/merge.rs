use std::{fs, path::PathBuf, time::Duration};

use criterion::{Criterion, criterion_group, criterion_main};
use crisol::{Config, merge_entry};
use tempfile::TempDir;

/// Build a project of `modules` files where each module imports the next,
/// so a merge walks the whole chain.
fn chained_project(modules: usize) -> (TempDir, PathBuf) {
    let temp = TempDir::new().expect("temp dir");
    for index in 0..modules {
        let body = if index + 1 < modules {
            format!(
                "from mod_{next} import fn_{next}\n\ndef fn_{index}(value):\n    return fn_{next}(value) + 1\n",
                next = index + 1
            )
        } else {
            format!("def fn_{index}(value):\n    return value\n")
        };
        fs::write(temp.path().join(format!("mod_{index}.py")), body).expect("write module");
    }
    let entry = temp.path().join("main.py");
    fs::write(&entry, "from mod_0 import fn_0\nresult = fn_0(0)\n").expect("write entry");
    (temp, entry)
}

fn benchmark_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");
    group.measurement_time(Duration::from_secs(10));

    for size in [4usize, 16, 64] {
        let (_temp, entry) = chained_project(size);
        group.bench_function(format!("chain_{size}"), |b| {
            b.iter(|| merge_entry(&entry, Config::default()).expect("merge succeeds"));
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_merge);
criterion_main!(benches);
