mod catalog;
mod config;
mod courses;
mod dictionary;
mod fetch;
mod nav;
mod prereq;
mod render;
mod urls;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::warn;
use url::Url;

use crate::config::CrawlConfig;
use crate::dictionary::CourseDictionary;
use crate::fetch::PageFetcher;

#[derive(Parser)]
#[command(name = "catalog_scraper", about = "Academic catalog crawler and prerequisite extractor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct CrawlArgs {
    /// Catalog root URL, e.g. https://catalog.example.edu/2025-2026/
    url: String,
    /// Also crawl graduate-section programs
    #[arg(long)]
    include_graduate: bool,
    /// Delay between page fetches, in milliseconds
    #[arg(long, default_value = "500")]
    delay_ms: u64,
    /// Override the course-dictionary cache path
    #[arg(long)]
    dictionary: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the course-dictionary cache (reuses an existing one)
    Dictionary(CrawlArgs),
    /// Crawl the catalog and write the summary JSON (requires the dictionary)
    Summarize {
        #[command(flatten)]
        args: CrawlArgs,
        /// Output file (default derived from the URL)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Pretty-print a summary JSON file
    Print {
        /// Summary JSON produced by `summarize`
        summary: PathBuf,
    },
    /// Render a summary JSON file as a Graphviz digraph
    Graph {
        /// Summary JSON produced by `summarize`
        summary: PathBuf,
        /// Output file (default: summary path with .dot extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Dictionary + summarize + print, one crawl
    Run {
        #[command(flatten)]
        args: CrawlArgs,
        /// Summary output file (default derived from the URL)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Dictionary(args) => {
            let ctx = CrawlContext::new(&args)?;
            let dict = ensure_dictionary(&ctx).await?;
            println!("Course dictionary ready: {} courses", dict.len());
            report_fetches(&ctx.fetcher);
            Ok(())
        }
        Commands::Summarize { args, output } => {
            let ctx = CrawlContext::new(&args)?;
            let dict = require_dictionary(&ctx)?;
            let summary = catalog::crawl_catalog(&ctx.fetcher, &ctx.root, &dict, &ctx.config).await;
            let out = output.unwrap_or_else(|| PathBuf::from(urls::summary_filename(&ctx.root)));
            render::write_summary_json(&summary, &out)?;
            println!(
                "Summary: {} schools, {} courses -> {}",
                summary.schools.len(),
                summary.total_courses,
                out.display()
            );
            report_fetches(&ctx.fetcher);
            Ok(())
        }
        Commands::Print { summary } => {
            let summary = render::load_summary_json(&summary)?;
            render::print_summary(&summary);
            Ok(())
        }
        Commands::Graph { summary, output } => {
            let out = output.unwrap_or_else(|| summary.with_extension("dot"));
            let summary = render::load_summary_json(&summary)?;
            render::write_dot_graph(&summary, &out)?;
            println!("Graph -> {}", out.display());
            Ok(())
        }
        Commands::Run { args, output } => {
            let ctx = CrawlContext::new(&args)?;

            // One crawl feeds both the dictionary and the summary.
            let extractions =
                catalog::collect_extractions(&ctx.fetcher, &ctx.root, &ctx.config).await;
            let dict = match load_cached(&ctx) {
                Some(dict) => dict,
                None => {
                    let dict = dictionary::build(extractions.iter().map(|e| &e.raw));
                    dictionary::save(&dict, &ctx.config.dictionary_path(&ctx.root))?;
                    dict
                }
            };

            let summary = catalog::summarize(&ctx.fetcher, &ctx.root, &dict, extractions).await;
            let out = output.unwrap_or_else(|| PathBuf::from(urls::summary_filename(&ctx.root)));
            render::write_summary_json(&summary, &out)?;
            render::print_summary(&summary);
            report_fetches(&ctx.fetcher);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

struct CrawlContext {
    root: Url,
    config: CrawlConfig,
    fetcher: PageFetcher,
}

impl CrawlContext {
    fn new(args: &CrawlArgs) -> Result<Self> {
        // Normalizing up front also restores the trailing slash relative
        // joins depend on.
        let root = Url::parse(&urls::normalize(&args.url)).context("parse catalog url")?;
        if root.scheme() != "http" && root.scheme() != "https" {
            bail!("catalog url must be http/https: {root}");
        }

        let config = CrawlConfig {
            include_graduate: args.include_graduate,
            fetch_delay: Duration::from_millis(args.delay_ms),
            dictionary_override: args.dictionary.clone(),
            ..CrawlConfig::default()
        };
        let fetcher = PageFetcher::new(&config)?;

        Ok(Self {
            root,
            config,
            fetcher,
        })
    }
}

/// Non-empty cached dictionary, if one can be read. A corrupt cache is
/// only a warning here: the build path may overwrite it.
fn load_cached(ctx: &CrawlContext) -> Option<CourseDictionary> {
    let path = ctx.config.dictionary_path(&ctx.root);
    match dictionary::load_if_present(&path) {
        Ok(Some(dict)) if !dict.is_empty() => Some(dict),
        Ok(_) => None,
        Err(e) => {
            warn!(error = %e, "unreadable course dictionary cache, rebuilding");
            None
        }
    }
}

/// Load the cached dictionary or crawl the catalog to build and save it.
async fn ensure_dictionary(ctx: &CrawlContext) -> Result<CourseDictionary> {
    if let Some(dict) = load_cached(ctx) {
        return Ok(dict);
    }

    println!("Building course dictionary from catalog...");
    let extractions = catalog::collect_extractions(&ctx.fetcher, &ctx.root, &ctx.config).await;
    let dict = dictionary::build(extractions.iter().map(|e| &e.raw));
    dictionary::save(&dict, &ctx.config.dictionary_path(&ctx.root))?;
    Ok(dict)
}

/// The summary path depends on a prebuilt dictionary; missing, empty, or
/// corrupt caches abort the run.
fn require_dictionary(ctx: &CrawlContext) -> Result<CourseDictionary> {
    let path = ctx.config.dictionary_path(&ctx.root);
    match dictionary::load_if_present(&path)? {
        Some(dict) if !dict.is_empty() => Ok(dict),
        _ => bail!(
            "course dictionary missing or empty at {}; run `dictionary` first",
            path.display()
        ),
    }
}

fn report_fetches(fetcher: &PageFetcher) {
    let stats = fetcher.stats();
    if stats.fetch_errors > 0 {
        println!(
            "Fetched {} pages ({} errors)",
            stats.pages_fetched, stats.fetch_errors
        );
    } else {
        println!("Fetched {} pages", stats.pages_fetched);
    }
}
