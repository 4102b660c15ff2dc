use anyhow::{Context, Result};
use clap::Parser;
use difftable_core::{ContextWindow, DiffEngine, DiffView, Fragment, Grid, Layout};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "difftable")]
#[command(about = "Render two files as a collapsible HTML diff grid")]
#[command(version)]
struct Cli {
    /// Old version of the file
    old: PathBuf,

    /// New version of the file
    new: PathBuf,

    /// Show old and new content side by side
    #[arg(long, conflicts_with = "unified")]
    split: bool,

    /// Show one interleaved content column
    #[arg(long)]
    unified: bool,

    /// Expand the collapsed context of this block after rendering (repeatable)
    #[arg(short = 'x', long = "expand", value_name = "INDEX")]
    expand: Vec<usize>,

    /// Unchanged lines shown around each change
    #[arg(long, value_name = "LINES")]
    context: Option<usize>,

    /// Write output to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the grid and fragments as JSON
    #[arg(long)]
    json: bool,

    /// Path to the config file (defaults to <config dir>/difftable/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct Output {
    grid: Grid,
    fragments: Vec<Fragment>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let config = Config::load(cli.config.as_deref())?;
    let layout = if cli.split {
        Layout::Split
    } else if cli.unified {
        Layout::Unified
    } else {
        config.layout
    };
    let window = ContextWindow {
        initial: cli.context.unwrap_or(config.context.initial),
        step: config.context.step,
    };

    let engine = DiffEngine::new().with_match_threshold(config.pairing.threshold);
    let blocks = engine.diff_files(&cli.old, &cli.new).with_context(|| {
        format!(
            "Failed to diff {} against {}",
            cli.old.display(),
            cli.new.display()
        )
    })?;
    tracing::info!("Computed {} diff blocks", blocks.len());

    let mut view = DiffView::new(blocks, layout)
        .with_view_id(config.view_id.clone())
        .with_window(window)
        .with_max_lines(config.max_lines);

    let grid = view.render(&engine).context("Failed to render diff")?;
    let fragments = cli
        .expand
        .iter()
        .map(|&index| {
            view.expand(index)
                .with_context(|| format!("Failed to expand block {}", index))
        })
        .collect::<Result<Vec<_>>>()?;

    let rendered = if cli.json {
        serde_json::to_string_pretty(&Output { grid, fragments })?
    } else {
        let mut html = grid.to_html();
        for fragment in &fragments {
            html.push_str(&format!(
                "\n<!-- replaces .{} -->\n{}",
                fragment.placeholder_class(),
                fragment.markup
            ));
        }
        html
    };

    match &cli.output {
        Some(path) => std::fs::write(path, rendered + "\n")
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", rendered)?;
        }
    }

    Ok(())
}
