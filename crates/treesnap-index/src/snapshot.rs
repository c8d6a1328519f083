//! Parallel snapshot builder.
//!
//! A discovery thread walks the tree and feeds relative paths into a bounded
//! queue. A pool of workers drains the queue and stats every path. The calling
//! thread is the only owner of the resulting map: it aggregates worker results
//! until every sender is gone, which doubles as the completion barrier.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use crossbeam_channel as channel;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::SnapshotConfig;
use crate::entry::Entry;
use crate::error::{IndexError, IndexResult};

/// A discovered path: absolute location and its name relative to the root.
type Discovered = (PathBuf, String);

/// Outcome of a single stat.
type Stat = IndexResult<(String, Entry)>;

/// Walk `root` and stat every path below it (root excluded).
///
/// The first error stops the walk and is returned; no partial map escapes.
pub(crate) fn scan(root: &Path, config: &SnapshotConfig) -> IndexResult<BTreeMap<String, Entry>> {
    let meta = std::fs::metadata(root).map_err(|e| IndexError::io(root, e))?;
    if !meta.is_dir() {
        return Err(IndexError::NotADirectory(root.to_path_buf()));
    }

    let started = Instant::now();
    let workers = config.parallelism.max(1);
    let (path_tx, path_rx) = channel::bounded::<Discovered>(config.queue_depth.max(1));
    let (stat_tx, stat_rx) = channel::unbounded::<Stat>();
    let cancelled = AtomicBool::new(false);

    let result = thread::scope(|scope| {
        let mut handles = Vec::with_capacity(workers + 1);

        let discover_tx = stat_tx.clone();
        let cancel = &cancelled;
        handles.push(scope.spawn(move || discover(root, &path_tx, &discover_tx, cancel)));

        for _ in 0..workers {
            let path_rx = path_rx.clone();
            let stat_tx = stat_tx.clone();
            handles.push(scope.spawn(move || stat_worker(&path_rx, &stat_tx, cancel)));
        }
        drop(stat_tx);
        drop(path_rx);

        let aggregated = aggregate(&stat_rx, &cancelled);

        let mut panicked = false;
        for handle in handles {
            panicked |= handle.join().is_err();
        }
        if panicked {
            return Err(IndexError::Interrupted);
        }
        aggregated
    })?;

    debug!(
        root = %root.display(),
        entries = result.len(),
        workers,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "snapshot built"
    );
    Ok(result)
}

fn discover(
    root: &Path,
    path_tx: &channel::Sender<Discovered>,
    stat_tx: &channel::Sender<Stat>,
    cancelled: &AtomicBool,
) {
    for item in WalkDir::new(root).min_depth(1) {
        if cancelled.load(Ordering::Acquire) {
            return;
        }

        let discovered = item
            .map_err(IndexError::from)
            .and_then(|entry| {
                let name = relative_name(root, entry.path())?;
                Ok((entry.into_path(), name))
            });

        match discovered {
            Ok(d) => {
                if path_tx.send(d).is_err() {
                    return;
                }
            }
            Err(err) => {
                cancelled.store(true, Ordering::Release);
                let _ = stat_tx.send(Err(err));
                return;
            }
        }
    }
}

fn stat_worker(
    path_rx: &channel::Receiver<Discovered>,
    stat_tx: &channel::Sender<Stat>,
    cancelled: &AtomicBool,
) {
    // Keep draining after cancellation so discovery never blocks on a full queue.
    for (path, name) in path_rx {
        if cancelled.load(Ordering::Acquire) {
            continue;
        }

        let stat = Entry::from_path(&path).map(|entry| (name, entry));
        if stat.is_err() {
            cancelled.store(true, Ordering::Release);
        }
        if stat_tx.send(stat).is_err() {
            return;
        }
    }
}

fn aggregate(
    stat_rx: &channel::Receiver<Stat>,
    cancelled: &AtomicBool,
) -> IndexResult<BTreeMap<String, Entry>> {
    let mut entries = BTreeMap::new();
    let mut first_err = None;

    for stat in stat_rx {
        match stat {
            Ok((name, entry)) if first_err.is_none() => {
                entries.insert(name, entry);
            }
            Ok(_) => {}
            Err(err) => {
                cancelled.store(true, Ordering::Release);
                first_err.get_or_insert(err);
            }
        }
    }

    match first_err {
        Some(err) => Err(err),
        None => Ok(entries),
    }
}

/// Slash-separated name of `path` relative to `root`.
pub(crate) fn relative_name(root: &Path, path: &Path) -> IndexResult<String> {
    let rel = path
        .strip_prefix(root)
        .map_err(|_| IndexError::InvalidPath(path.display().to_string()))?;

    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(
                part.to_str()
                    .ok_or_else(|| IndexError::InvalidPath(path.display().to_string()))?,
            ),
            Component::CurDir => {}
            _ => return Err(IndexError::InvalidPath(path.display().to_string())),
        }
    }

    if parts.is_empty() {
        return Err(IndexError::InvalidPath(path.display().to_string()));
    }
    Ok(parts.join("/"))
}

/// Native path of the slash-separated `name` under `root`.
pub(crate) fn native_path(root: &Path, name: &str) -> PathBuf {
    name.split('/')
        .filter(|part| !part.is_empty())
        .fold(root.to_path_buf(), |path, part| path.join(part))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture;

    #[test]
    fn scan_excludes_root() {
        let tree = fixture::generate_tree();
        let entries = scan(tree.path(), &SnapshotConfig::default()).unwrap();

        assert_eq!(entries.len(), fixture::FILETREE.len());
        assert!(!entries.contains_key(""));
        for (name, size) in fixture::FILETREE {
            let key = name.trim_end_matches('/');
            let entry = entries.get(key).unwrap_or_else(|| panic!("missing {key}"));
            if name.ends_with('/') {
                assert!(entry.is_dir(), "{key} should be a directory");
            } else {
                assert_eq!(entry.file.size, *size, "size of {key}");
            }
        }
    }

    #[test]
    fn scan_is_independent_of_worker_count() {
        let tree = fixture::generate_tree();
        let one = scan(tree.path(), &SnapshotConfig::default().with_parallelism(1)).unwrap();
        let many = scan(tree.path(), &SnapshotConfig::default().with_parallelism(16)).unwrap();

        let one: Vec<_> = one.iter().map(|(k, v)| (k.clone(), v.file)).collect();
        let many: Vec<_> = many.iter().map(|(k, v)| (k.clone(), v.file)).collect();
        assert_eq!(one, many);
    }

    #[test]
    fn scan_with_tiny_queue() {
        let tree = fixture::generate_tree();
        let config = SnapshotConfig {
            parallelism: 3,
            queue_depth: 1,
        };
        let entries = scan(tree.path(), &config).unwrap();
        assert_eq!(entries.len(), fixture::FILETREE.len());
    }

    #[test]
    fn scan_rejects_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let err = scan(&dir.path().join("gone"), &SnapshotConfig::default()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn scan_rejects_file_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f.txt");
        std::fs::write(&file, b"x").unwrap();

        let err = scan(&file, &SnapshotConfig::default()).unwrap_err();
        assert!(matches!(err, IndexError::NotADirectory(_)));
    }

    #[cfg(unix)]
    #[test]
    fn scan_stops_on_bad_name_mid_walk() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tree = fixture::generate_tree();
        let bad = tree.path().join("d").join(OsStr::from_bytes(b"bad\xff"));
        std::fs::write(&bad, b"x").unwrap();

        for (parallelism, queue_depth) in [(1, 1), (1, 1024), (8, 1), (8, 1024)] {
            let config = SnapshotConfig {
                parallelism,
                queue_depth,
            };
            let result = scan(tree.path(), &config);
            assert!(
                matches!(result, Err(IndexError::InvalidPath(_))),
                "workers={parallelism} queue={queue_depth}: {result:?}"
            );
        }
    }

    #[test]
    fn relative_names_use_slashes() {
        let root = Path::new("/srv/tree");
        assert_eq!(
            relative_name(root, &root.join("d").join("dc").join("dca.txt")).unwrap(),
            "d/dc/dca.txt"
        );
        assert!(matches!(
            relative_name(root, root),
            Err(IndexError::InvalidPath(_))
        ));
        assert!(relative_name(root, Path::new("/elsewhere/x")).is_err());
    }

    #[test]
    fn native_path_joins_components() {
        let root = Path::new("/srv/tree");
        assert_eq!(native_path(root, "d/dc/dca.txt"), root.join("d").join("dc").join("dca.txt"));
    }
}
