//! Stress demo: one writer thread per leaf, optional polling readers, then
//! a check that the root adds up and a dump of the tree.
//!
//! Run with:
//! ```bash
//! cargo run --example stress --features demo -- --help
//! RUST_LOG=sommatori=trace cargo run --example stress --features demo -- -d 2 -n 10
//! ```

use clap::{Parser, ValueEnum};
use sommatori::observers::json::JsonObserver;
use sommatori::observers::table::{TableObserver, TableStyle};
use sommatori::tree::{SumTree, TreeConfig};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, ScopedJoinHandle};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Output format for the final tree dump.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// One row per node
    Table,
    /// Leaf counters in a grid
    Compact,
    /// JSON report with totals
    Json,
    /// Nothing but the summary line
    None,
}

/// Table style selection.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum StyleChoice {
    Ascii,
    #[default]
    Rounded,
    Sharp,
    Modern,
    Markdown,
}

impl From<StyleChoice> for TableStyle {
    fn from(choice: StyleChoice) -> Self {
        match choice {
            StyleChoice::Ascii => TableStyle::Ascii,
            StyleChoice::Rounded => TableStyle::Rounded,
            StyleChoice::Sharp => TableStyle::Sharp,
            StyleChoice::Modern => TableStyle::Modern,
            StyleChoice::Markdown => TableStyle::Markdown,
        }
    }
}

/// Stress demo for sommatori - lock-free cached summation trees.
///
/// Builds a full tree, spawns one writer per leaf, optionally polls the
/// root from reader threads, and checks the final total.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Depth of the full tree (arity^depth leaves)
    #[arg(short, long, default_value = "3")]
    depth: u32,

    /// Children per internal node
    #[arg(short, long, default_value = "2")]
    arity: usize,

    /// Increments performed by each writer
    #[arg(short = 'n', long, default_value = "100000")]
    increments: u64,

    /// Number of reader threads polling the root
    #[arg(short, long, default_value = "1")]
    readers: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value = "compact")]
    format: OutputFormat,

    /// Table style (for table/compact formats)
    #[arg(short, long, value_enum, default_value = "rounded")]
    style: StyleChoice,

    /// Number of columns (for compact format)
    #[arg(short, long, default_value = "4")]
    columns: usize,

    /// Pretty print JSON output
    #[arg(long)]
    pretty: bool,
}

/// Joins every writer, reporting each one that panicked. Returns the count.
fn join_writers(writers: Vec<ScopedJoinHandle<'_, ()>>) -> usize {
    let mut failed = 0;
    for (i, writer) in writers.into_iter().enumerate() {
        if writer.join().is_err() {
            eprintln!("writer {i} panicked");
            failed += 1;
        }
    }
    failed
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut tree = SumTree::with_config(TreeConfig::new().arity(args.arity)).with_name("stress");
    let root = match tree.build_full_tree(args.depth) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("cannot build tree: {e}");
            return ExitCode::FAILURE;
        }
    };
    let root = match tree.node(root) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let leaves = root.all_leaves();
    println!(
        "tree: {} nodes, {} leaves, {} readers, {} increments per writer",
        tree.len(),
        leaves.len(),
        args.readers,
        args.increments
    );

    let done = AtomicBool::new(false);
    let polls = AtomicU64::new(0);
    let start = Instant::now();

    let failed = thread::scope(|s| {
        for _ in 0..args.readers {
            s.spawn(|| {
                while !done.load(Ordering::Acquire) {
                    std::hint::black_box(root.sum());
                    polls.fetch_add(1, Ordering::Relaxed);
                }
            });
        }

        let writers: Vec<_> = leaves
            .iter()
            .map(|&leaf| {
                s.spawn(move || {
                    for _ in 0..args.increments {
                        leaf.increment();
                    }
                })
            })
            .collect();
        let failed = join_writers(writers);
        done.store(true, Ordering::Release);
        failed
    });

    if failed > 0 {
        eprintln!("{failed} writer(s) did not finish, skipping the total check");
        return ExitCode::FAILURE;
    }

    let elapsed = start.elapsed();
    let expected = args.increments * leaves.len() as u64;

    match args.format {
        OutputFormat::Table | OutputFormat::Compact => {
            let observer = TableObserver::new()
                .with_style(args.style.into())
                .compact(matches!(args.format, OutputFormat::Compact))
                .columns(args.columns);
            println!("{}", observer.render(&tree));
        }
        OutputFormat::Json => {
            match JsonObserver::new()
                .pretty(args.pretty)
                .with_total(true)
                .to_json(&tree)
            {
                Ok(json) => println!("{json}"),
                Err(e) => eprintln!("json export failed: {e}"),
            }
        }
        OutputFormat::None => {}
    }

    let total = root.sum();
    println!(
        "total: {total} (expected {expected}) in {:.2?}, {} reader polls",
        elapsed,
        polls.load(Ordering::Relaxed)
    );

    if total == expected {
        ExitCode::SUCCESS
    } else {
        eprintln!("mismatch: {} increments lost or double-counted", expected.abs_diff(total));
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_writers_counts_panics() {
        let failed = thread::scope(|s| {
            let writers = vec![
                s.spawn(|| {}),
                s.spawn(|| panic!("writer died")),
                s.spawn(|| {}),
            ];
            join_writers(writers)
        });
        assert_eq!(failed, 1);
    }

    #[test]
    fn test_join_writers_all_ok() {
        let failed = thread::scope(|s| join_writers((0..4).map(|_| s.spawn(|| {})).collect()));
        assert_eq!(failed, 0);
    }
}
