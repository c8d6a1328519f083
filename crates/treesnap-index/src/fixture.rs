//! Test fixture trees.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use crossbeam_channel as channel;
use rand::RngCore;
use tempfile::TempDir;

use crate::snapshot::native_path;

/// Sample tree: names ending with `/` are directories, the rest are files of
/// the given size.
pub(crate) const FILETREE: &[(&str, u64)] = &[
    ("a.txt", 128),
    ("b.bin", 300 * 1024),
    ("c/", 0),
    ("c/ca.txt", 2 * 1024),
    ("c/cb.bin", 1024 * 1024),
    ("d/", 0),
    ("d/da.txt", 5 * 1024),
    ("d/db.txt", 256),
    ("d/dc/", 0),
    ("d/dc/dca.txt", 3 * 1024),
    ("d/dc/dcb.txt", 1024),
];

pub(crate) fn generate_tree() -> TempDir {
    generate(FILETREE)
}

/// Materialize `tree` in a fresh temporary directory using a pool of writers.
pub(crate) fn generate(tree: &[(&str, u64)]) -> TempDir {
    let root = tempfile::tempdir().expect("create temp dir");
    let (tx, rx) = channel::unbounded::<(&str, u64)>();
    for &item in tree {
        tx.send(item).expect("queue fixture item");
    }
    drop(tx);

    thread::scope(|scope| {
        for _ in 0..4 {
            let rx = rx.clone();
            let root = root.path();
            scope.spawn(move || {
                for (name, size) in rx {
                    match name.strip_suffix('/') {
                        Some(dir) => add_dir(root, dir),
                        None => write_file(root, name, size),
                    }
                }
            });
        }
    });

    // Coarse file system clocks: keep later edits on a distinct tick.
    settle();
    root
}

pub(crate) fn settle() {
    thread::sleep(Duration::from_millis(50));
}

pub(crate) fn add_dir(root: &Path, name: &str) {
    fs::create_dir_all(native_path(root, name)).expect("create dir");
}

pub(crate) fn write_file(root: &Path, name: &str, size: u64) {
    let path = native_path(root, name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }

    let mut content = vec![0u8; size as usize];
    rand::thread_rng().fill_bytes(&mut content);
    fs::write(path, content).expect("write file");
}

pub(crate) fn remove_all(root: &Path, name: &str) {
    let path = native_path(root, name);
    if path.is_dir() {
        fs::remove_dir_all(path).expect("remove dir");
    } else {
        fs::remove_file(path).expect("remove file");
    }
}

pub(crate) fn rename(root: &Path, from: &str, to: &str) {
    fs::rename(native_path(root, from), native_path(root, to)).expect("rename");
}
