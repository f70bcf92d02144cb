//! Command-line harness for the rgview engine.
//!
//! Runs one search session to completion and prints the rendered model.
//! This is a driver for the engine, not the interactive UI the engine is
//! designed for.

mod config;
mod logging;

use anyhow::{Context, bail};
use clap::Parser;
use config::Config;
use rgview_core::{FileTypeCatalog, RenderModel, Row, SessionCache, SessionCacheConfig};
use rgview_types::{CaseMode, ContextDepth, ExitOutcome, FileFilter, SearchKind, SearchSettings, SessionKey};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rgview", about = "Search-result engine harness", version)]
struct Cli {
    /// Search term.
    term: Option<String>,

    /// Directory to search.
    #[arg(default_value = ".")]
    directory: PathBuf,

    /// Fixed-string search instead of regex.
    #[arg(long, conflicts_with = "word")]
    literal: bool,

    /// Fixed-string search constrained to word boundaries.
    #[arg(long)]
    word: bool,

    /// Case mode: smart, sensitive, or ignore.
    #[arg(long, default_value = "smart")]
    case: String,

    /// Restrict to one of the tool's named file types.
    #[arg(long = "type", conflicts_with = "glob")]
    file_type: Option<String>,

    /// Restrict to files matching a glob.
    #[arg(long)]
    glob: Option<String>,

    /// Context lines before and after each match.
    #[arg(long)]
    context: Option<u32>,

    /// Skip hidden files.
    #[arg(long)]
    skip_hidden: bool,

    /// Bypass VCS ignore files.
    #[arg(long)]
    no_ignore: bool,

    /// Print the invocation that would run, without running it.
    #[arg(long)]
    dry_run: bool,

    /// Print the most relevant file type for a filename and exit.
    #[arg(long, value_name = "FILENAME")]
    detect_type: Option<String>,

    /// Config file path (defaults to the platform config directory).
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
    #[arg(long)]
    debug: bool,
    #[arg(long)]
    trace: bool,
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn settings(&self, extra_args: Vec<String>) -> anyhow::Result<SearchSettings> {
        let kind = if self.word {
            SearchKind::Word
        } else if self.literal {
            SearchKind::Literal
        } else {
            SearchKind::Regex
        };
        let case = match self.case.as_str() {
            "smart" => CaseMode::Smart,
            "sensitive" => CaseMode::Sensitive,
            "ignore" => CaseMode::Ignore,
            other => bail!("unknown case mode '{other}' (use smart, sensitive, or ignore)"),
        };
        let filter = if let Some(name) = &self.file_type {
            FileFilter::Type(name.clone())
        } else if let Some(pattern) = &self.glob {
            FileFilter::Glob(pattern.clone())
        } else {
            FileFilter::All
        };
        Ok(SearchSettings {
            kind,
            case,
            filter,
            context: self.context.map(|n| ContextDepth {
                before: n,
                after: n,
            }),
            skip_hidden: self.skip_hidden,
            skip_vcs_ignores: self.no_ignore,
            extra_args,
        })
    }
}

fn print_model(model: &RenderModel) {
    for (_, row) in model.visible_rows() {
        match row {
            Row::Heading { filename } => println!("{filename}"),
            Row::Line {
                line_number,
                content,
                truncated,
                ..
            } => {
                let marker = if *truncated { "…" } else { "" };
                println!("{}{content}{marker}", RenderModel::gutter_text(*line_number));
            }
            Row::Divider => println!("{}", RenderModel::divider_text()),
            Row::Diagnostic(text) => println!("# {text}"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(logging::LogPreset::from_cli(
        cli.verbose,
        cli.debug,
        cli.trace,
        cli.quiet,
    ));

    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::load()?,
    };

    if let Some(filename) = &cli.detect_type {
        let catalog = FileTypeCatalog::query(&config.rg_path).await?;
        match catalog.relevant_type(filename) {
            Some(name) => println!("{name}"),
            None => println!("no match"),
        }
        return Ok(());
    }

    let Some(term) = cli.term.clone() else {
        bail!("a search term is required (or use --detect-type)");
    };
    let settings = cli.settings(config.extra_args.clone())?;

    let mut cache = SessionCache::new(SessionCacheConfig {
        program: config.rg_path.clone(),
        capacity: config.capacity(),
    });
    let key = SessionKey::new(term, cli.directory.clone());
    let session = cache
        .get_or_create(key, settings, cli.dry_run)
        .await?;

    if cli.dry_run {
        if let Some(spec) = session.invocation() {
            println!("{}", spec.display());
        }
        return Ok(());
    }

    session.run_to_completion().await;
    print_model(session.render());
    eprintln!("{} matches", session.match_count());

    match session.last_outcome() {
        Some(ExitOutcome::Abnormal { code, detail }) => {
            bail!("search failed (code {code:?}): {}", detail.trim_end());
        }
        _ => Ok(()),
    }
}
