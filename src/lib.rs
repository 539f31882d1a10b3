pub mod archive;
pub mod attachments;
pub mod bootstrap;
pub mod config;
pub mod model;
pub mod records;
pub mod search;
pub mod site;
pub mod verify;

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use once_cell::sync::Lazy;

use bootstrap::BootstrapOptions;
use config::SiteConfig;
use search::query::{SearchClient, SearchFilters};

static LONG_VERSION: Lazy<String> = Lazy::new(|| match option_env!("VERGEN_BUILD_TIMESTAMP") {
    Some(ts) => format!("{} (built {ts})", env!("CARGO_PKG_VERSION")),
    None => env!("CARGO_PKG_VERSION").to_string(),
});

/// Command-line interface.
#[derive(Parser, Debug)]
#[command(
    name = "groupsite",
    version,
    long_version = LONG_VERSION.as_str(),
    about = "Turn a web-archive capture of a mailing list into a static, searchable site"
)]
pub struct Cli {
    /// Config file (defaults to ./groupsite.toml, then the platform config dir)
    #[arg(long, global = true, env = "GROUPSITE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for records and the search index
    #[arg(long, global = true)]
    pub out_dir: Option<PathBuf>,

    /// Directory the static site is written to
    #[arg(long, global = true)]
    pub site_dir: Option<PathBuf>,

    /// More logging (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract message records from a WARC capture
    Extract {
        /// WARC file (.warc or .warc.gz)
        warc: PathBuf,
    },
    /// Build the search index and docs.json from extracted records
    Index,
    /// Generate the static pages from extracted records
    Pages {
        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },
    /// Extract, index and generate pages in one go
    Build {
        /// WARC file (.warc or .warc.gz)
        warc: PathBuf,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },
    /// Query the search index
    Search {
        query: String,

        /// Maximum number of hits
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Only messages from this year
        #[arg(long)]
        year: Option<i32>,

        /// Print hits as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replay the navigation bootstrap over every generated page
    Verify {
        /// Base URL the site is served from (overrides config)
        #[arg(long)]
        base_url: Option<String>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List attachments and file links found in records and captures
    FindFiles {
        /// Directory holding WARC captures (overrides config)
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Generate shell completions to stdout
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

impl Cli {
    /// Configuration with command-line overrides applied.
    pub fn site_config(&self) -> Result<SiteConfig> {
        let mut config = SiteConfig::load(self.config.as_deref()).context("loading configuration")?;
        if let Some(dir) = &self.out_dir {
            config.out_dir = dir.clone();
        }
        if let Some(dir) = &self.site_dir {
            config.site_dir = dir.clone();
        }
        Ok(config)
    }
}

pub fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = cli.site_config()?;
    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::Extract { warc } => {
            let stats = archive::run_extract(&warc, &config)?;
            writeln!(out, "{}", serde_json::to_string(&stats)?)?;
        }
        Commands::Index => {
            let count = search::run_index(&config)?;
            writeln!(out, "indexed {count} messages")?;
        }
        Commands::Pages { no_progress } => {
            let summary = site::run_pages(&config, !no_progress)?;
            writeln!(out, "{}", serde_json::to_string(&summary)?)?;
        }
        Commands::Build { warc, no_progress } => {
            let stats = archive::run_extract(&warc, &config)?;
            let indexed = search::run_index(&config)?;
            let summary = site::run_pages(&config, !no_progress)?;
            writeln!(
                out,
                "{}",
                serde_json::json!({ "extract": stats, "indexed": indexed, "site": summary })
            )?;
        }
        Commands::Search {
            query,
            limit,
            year,
            json,
        } => {
            let client = SearchClient::open(&config.index_base())
                .context("opening search index (run `groupsite index` first?)")?;
            let hits = client.search(&query, &SearchFilters { year }, limit)?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&hits)?)?;
            } else if hits.is_empty() {
                writeln!(out, "no matches for {query:?}")?;
            } else {
                for hit in &hits {
                    writeln!(
                        out,
                        "{:>7.3}  {:<10} {}  ({}, {})",
                        hit.score,
                        hit.id,
                        hit.subject,
                        hit.author,
                        hit.timestamp.as_deref().unwrap_or("undated")
                    )?;
                    if !hit.snippet.is_empty() {
                        writeln!(out, "         {}", hit.snippet.replace('\n', " "))?;
                    }
                }
            }
        }
        Commands::Verify { base_url, json } => {
            if let Some(url) = base_url {
                config.base_url = url;
            }
            let options = BootstrapOptions {
                inject_stylesheet: config.inject_stylesheet,
            };
            let report = verify::verify_site(&config.site_dir, &config.base_url, options)?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
            } else {
                for page in report.results.iter().filter(|r| !r.ok()) {
                    for problem in &page.problems {
                        writeln!(out, "FAIL {}: {problem}", page.page)?;
                    }
                }
                writeln!(out, "{} pages checked, {} failed", report.pages, report.failed)?;
            }
            if !report.ok() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::FindFiles { data_dir } => {
            let data_dir = data_dir.unwrap_or_else(|| config.data_dir.clone());
            let mut emit = |candidate: attachments::FileCandidate| -> Result<()> {
                writeln!(out, "{}", serde_json::to_string(&candidate)?)?;
                Ok(())
            };
            let listed = attachments::scan_ndjson_dir(&config.by_year_dir(), &mut emit)?;
            let captured = attachments::scan_warc_dir(&data_dir, &mut emit)?;
            tracing::info!(component = "find_files", listed, captured, "file scan complete");
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "groupsite", &mut out);
        }
    }
    Ok(ExitCode::SUCCESS)
}
