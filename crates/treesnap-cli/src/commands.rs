use anyhow::Context;
use colored::Colorize;
use treesnap_index::{Change, ChangeMeta, ChangeSet, Index, SnapshotConfig};

use crate::cli::*;
use crate::config::CliConfig;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::load(cli.config.as_deref())?;
    let snapshot = config.snapshot_config(cli.workers);

    match cli.command {
        Command::Snapshot(args) => cmd_snapshot(&args, &snapshot, &cli.format),
        Command::Diff(args) => cmd_diff(&args, &snapshot, &cli.format),
        Command::Refresh(args) => cmd_refresh(&args, &snapshot, &cli.format),
        Command::Count(args) => cmd_count(&args, &cli.format).map(|_| ()),
    }
}

fn cmd_snapshot(args: &SnapshotArgs, config: &SnapshotConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let index = Index::from_tree_with(&args.root, config)
        .with_context(|| format!("snapshotting {}", args.root.display()))?;
    index
        .save(&args.output)
        .with_context(|| format!("saving index to {}", args.output.display()))?;

    match format {
        OutputFormat::Text => println!(
            "{} Indexed {} entries ({} bytes) into {}",
            "✓".green().bold(),
            index.len().to_string().bold(),
            index.total_size(),
            args.output.display(),
        ),
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "entries": index.len(), "size": index.total_size() })
        ),
    }
    Ok(())
}

fn cmd_diff(args: &DiffArgs, config: &SnapshotConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let index = load_index(&args.index)?;
    let changes = index
        .compare_with(&args.root, config)
        .with_context(|| format!("comparing {}", args.root.display()))?;

    print_changes(&changes, format)
}

fn cmd_refresh(args: &RefreshArgs, config: &SnapshotConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let mut index = load_index(&args.index)?;
    let changes = index
        .compare_with(&args.root, config)
        .with_context(|| format!("comparing {}", args.root.display()))?;

    if !args.dry_run && !changes.is_empty() {
        index
            .apply(&args.root, &changes)
            .with_context(|| format!("applying changes under {}", args.root.display()))?;
        index
            .save(&args.index)
            .with_context(|| format!("saving index to {}", args.index.display()))?;
        tracing::info!(changes = changes.len(), "index refreshed");
    }

    print_changes(&changes, format)
}

fn cmd_count(args: &CountArgs, format: &OutputFormat) -> anyhow::Result<usize> {
    let index = load_index(&args.index)?;
    let count = index.count(args.max_size);

    match format {
        OutputFormat::Text => println!("{count}"),
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "max_size": args.max_size, "count": count })
        ),
    }
    Ok(count)
}

fn load_index(path: &std::path::Path) -> anyhow::Result<Index> {
    Index::load(path).with_context(|| format!("loading index from {}", path.display()))
}

fn print_changes(changes: &ChangeSet, format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(changes)?),
        OutputFormat::Text if changes.is_empty() => println!("No changes."),
        OutputFormat::Text => {
            for change in changes {
                println!("  {}", colorize(change));
            }
            println!(
                "{} added, {} updated, {} removed; {} bytes to transfer",
                changes.additions().to_string().green(),
                changes.updates().to_string().yellow(),
                changes.removals().to_string().red(),
                changes.transfer_size(),
            );
        }
    }
    Ok(())
}

fn colorize(change: &Change) -> String {
    let line = change.to_string();
    match change.meta {
        ChangeMeta::Add => line.green().to_string(),
        ChangeMeta::Update => line.yellow().to_string(),
        ChangeMeta::Remove => line.red().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn sample_tree(root: &Path) {
        fs::create_dir_all(root.join("d")).unwrap();
        fs::write(root.join("a.txt"), vec![1u8; 128]).unwrap();
        fs::write(root.join("d").join("da.txt"), vec![2u8; 512]).unwrap();
    }

    #[test]
    fn snapshot_then_refresh_converges() {
        let tree = tempfile::tempdir().unwrap();
        let state = tempfile::tempdir().unwrap();
        sample_tree(tree.path());
        let index_path = state.path().join("index.json");
        let config = SnapshotConfig::default();

        cmd_snapshot(
            &SnapshotArgs { root: tree.path().to_path_buf(), output: index_path.clone() },
            &config,
            &OutputFormat::Text,
        )
        .unwrap();
        assert_eq!(Index::load(&index_path).unwrap().len(), 3);

        fs::write(tree.path().join("b.txt"), b"new").unwrap();
        cmd_refresh(
            &RefreshArgs { root: tree.path().to_path_buf(), index: index_path.clone(), dry_run: false },
            &config,
            &OutputFormat::Json,
        )
        .unwrap();

        let index = Index::load(&index_path).unwrap();
        assert_eq!(index.len(), 4);
        assert!(index.compare(tree.path()).unwrap().is_empty());
    }

    #[test]
    fn dry_run_leaves_index_alone() {
        let tree = tempfile::tempdir().unwrap();
        let state = tempfile::tempdir().unwrap();
        sample_tree(tree.path());
        let index_path = state.path().join("index.json");
        Index::from_tree(tree.path()).unwrap().save(&index_path).unwrap();

        fs::write(tree.path().join("b.txt"), b"new").unwrap();
        cmd_refresh(
            &RefreshArgs { root: tree.path().to_path_buf(), index: index_path.clone(), dry_run: true },
            &SnapshotConfig::default(),
            &OutputFormat::Text,
        )
        .unwrap();

        assert_eq!(Index::load(&index_path).unwrap().len(), 3);
    }

    #[test]
    fn count_reads_saved_index() {
        let tree = tempfile::tempdir().unwrap();
        let state = tempfile::tempdir().unwrap();
        sample_tree(tree.path());
        let index_path = state.path().join("index.json");
        Index::from_tree(tree.path()).unwrap().save(&index_path).unwrap();

        let count = |max_size| {
            cmd_count(&CountArgs { index: index_path.clone(), max_size }, &OutputFormat::Text).unwrap()
        };
        assert_eq!(count(0), 0);
        assert_eq!(count(-1), 3);
        assert_eq!(count(i64::MAX), 3);
    }

    #[test]
    fn diff_without_index_fails() {
        let tree = tempfile::tempdir().unwrap();
        let err = cmd_diff(
            &DiffArgs { root: tree.path().to_path_buf(), index: tree.path().join("missing.json") },
            &SnapshotConfig::default(),
            &OutputFormat::Text,
        )
        .unwrap_err();
        assert!(err.to_string().contains("loading index"));
    }
}
