//! docsift CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use docsift::{
    commands::{
        cmd_audit_log, cmd_ingest_dir, cmd_ingest_file, cmd_init, cmd_list_documents,
        cmd_search, cmd_status, cmd_unindex, print_audit_log, print_documents,
        print_ingest_file, print_ingest_stats, print_init, print_search_results, print_status,
        print_unindex_stats, IngestOptions, InitOptions, SortKey,
    },
    config::Config,
    error::{Error, Result},
    extract::PdfExtractor,
    identity::DocumentId,
    progress::LogWriterFactory,
    search::SearchRequest,
    store::{Facets, SqliteStore},
};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "docsift")]
#[command(version, about = "PDF keyword indexing and faceted search", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "DOCSIFT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Descriptive facets recorded with an upload
#[derive(clap::Args, Debug, Default)]
struct FacetArgs {
    /// Subjects (repeat or comma-separate)
    #[arg(long = "subject", value_delimiter = ',')]
    subjects: Vec<String>,

    /// Formats (repeat or comma-separate)
    #[arg(long = "format", value_delimiter = ',')]
    formats: Vec<String>,

    /// Sources (repeat or comma-separate)
    #[arg(long = "source", value_delimiter = ',')]
    sources: Vec<String>,

    /// Publication year
    #[arg(long)]
    year: Option<i32>,

    /// State, or "International" to record the country instead
    #[arg(long)]
    state: Option<String>,

    /// Country, used when the state is "International"
    #[arg(long)]
    country: Option<String>,

    /// Short description
    #[arg(long)]
    summary: Option<String>,

    /// Storage container recorded as provenance
    #[arg(long)]
    container: Option<String>,

    /// Re-ingest even if the same content is already indexed
    #[arg(long)]
    force: bool,
}

impl FacetArgs {
    fn into_options(self, title: Option<String>) -> IngestOptions {
        let csv = |values: Vec<String>| {
            let joined = values
                .iter()
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .collect::<Vec<_>>()
                .join(",");
            (!joined.is_empty()).then_some(joined)
        };

        IngestOptions {
            facets: Facets {
                title,
                subject: csv(self.subjects),
                format: csv(self.formats),
                source: csv(self.sources),
                year: self.year,
                location: Facets::location_from(self.state.as_deref(), self.country.as_deref()),
                summary: self.summary,
            },
            container: self.container,
            force: self.force,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize docsift configuration and database
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Index a single PDF
    Ingest {
        /// Path to the PDF
        path: PathBuf,

        /// Display title (defaults to the file name)
        #[arg(long)]
        title: Option<String>,

        #[command(flatten)]
        facets: FacetArgs,
    },

    /// Index every PDF under a directory
    IngestDir {
        /// Path to directory
        path: PathBuf,

        #[command(flatten)]
        facets: FacetArgs,
    },

    /// Search by keywords and facets
    Search {
        /// Keywords; omit to list everything matching the facet filters
        phrase: Option<String>,

        /// Match any of these subjects
        #[arg(long = "subject", value_delimiter = ',')]
        subjects: Vec<String>,

        /// Match any of these formats
        #[arg(long = "format", value_delimiter = ',')]
        formats: Vec<String>,

        /// Match any of these sources
        #[arg(long = "source", value_delimiter = ',')]
        sources: Vec<String>,

        /// Exact year, or the start of a range with --end-year
        #[arg(long)]
        start_year: Option<i32>,

        /// End of the year range (inclusive)
        #[arg(long)]
        end_year: Option<i32>,

        /// State or country
        #[arg(long)]
        location: Option<String>,

        /// Skip this many matches
        #[arg(long, default_value = "0")]
        offset: usize,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// List indexed documents, newest first
    Documents {
        /// Sort by title, subject, format or source instead
        #[arg(long)]
        sort: Option<SortKey>,
    },

    /// Show ingestion attempts for a document
    Log {
        /// Document ID
        document_id: String,
    },

    /// Remove a document's postings from the keyword index
    Unindex {
        /// Document ID
        document_id: String,

        /// Only remove these keywords (repeat or comma-separate)
        #[arg(long = "keyword", value_delimiter = ',')]
        keywords: Vec<String>,
    },

    /// Show index status
    Status,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json {
        registry
            .with(fmt::layer().json().with_writer(LogWriterFactory))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(LogWriterFactory))
            .init();
    }

    // Completions need neither config nor database
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "docsift", &mut std::io::stdout());
        return Ok(());
    }

    if let Commands::Init { force } = cli.command {
        let base_dir = cli
            .config
            .as_deref()
            .and_then(|p| p.parent())
            .map(PathBuf::from)
            .unwrap_or_else(Config::default_base_dir);
        let config = cmd_init(InitOptions {
            base_dir,
            config_file: cli.config.clone(),
            force,
        })
        .await?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            print_init(&config);
        }
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;

    // One store handle for the whole process
    let store = SqliteStore::connect(&config).await?;
    if !store.is_initialized().await? {
        return Err(Error::NotInitialized);
    }
    let extractor = PdfExtractor;

    match cli.command {
        Commands::Init { .. } | Commands::Completions { .. } => unreachable!(),

        Commands::Ingest {
            path,
            title,
            facets,
        } => {
            let options = facets.into_options(title);
            let id = cmd_ingest_file(&config, &store, &extractor, &path, &options).await?;
            if cli.json {
                println!("{}", serde_json::json!({ "document_id": id }));
            } else {
                print_ingest_file(&path, &id);
            }
        }

        Commands::IngestDir { path, facets } => {
            let options = facets.into_options(None);
            let stats = cmd_ingest_dir(&config, &store, &extractor, &path, &options).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_ingest_stats(&stats);
            }
        }

        Commands::Search {
            phrase,
            subjects,
            formats,
            sources,
            start_year,
            end_year,
            location,
            offset,
            limit,
        } => {
            let request = SearchRequest {
                phrase,
                subjects,
                formats,
                sources,
                start_year,
                end_year,
                location,
                offset,
                limit,
            };

            let response = cmd_search(&config, &store, &request).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_search_results(&response);
            }
        }

        Commands::Documents { sort } => {
            let docs = cmd_list_documents(&config, &store, sort).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&docs)?);
            } else {
                print_documents(&docs);
            }
        }

        Commands::Log { document_id } => {
            let entries = cmd_audit_log(&store, &DocumentId::new(document_id)).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                print_audit_log(&entries);
            }
        }

        Commands::Unindex {
            document_id,
            keywords,
        } => {
            let id = DocumentId::new(document_id);
            let stats = cmd_unindex(&config, &store, &id, keywords).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_unindex_stats(&id, &stats);
            }
        }

        Commands::Status => {
            let status = cmd_status(&config, &store).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => Config::load_from(None)?,
    };

    if !config.is_initialized() {
        return Err(Error::NotInitialized);
    }
    Ok(config)
}
