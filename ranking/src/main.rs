//! asreview-rank CLI - ASReview rankings for library collections
//!
//! ```bash
//! asreview-rank parse asreview.csv                  # Parsed rows as JSON
//! asreview-rank rank --library library.json         # Ranks for every collection
//! asreview-rank serve --library library.json        # HTTP server (port 3000)
//! ```

use asreview_rank::{
    parse_ranking_file, write_ranking_table, CollectionId, FsStore, Library, RankLookup,
    RankingCache, RankingConfig, SnapshotLibrary,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "asreview-rank")]
#[command(about = "Match ASReview ranking files to library collections", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a ranking file and print its rows
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: Format,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rank the items of a library snapshot
    Rank {
        /// Library snapshot (JSON)
        #[arg(short, long, env = "ASREVIEW_LIBRARY")]
        library: PathBuf,

        /// Only this collection
        #[arg(short, long)]
        collection: Option<u64>,
    },

    /// Start HTTP server
    Serve {
        /// Library snapshot (JSON)
        #[arg(short, long, env = "ASREVIEW_LIBRARY")]
        library: PathBuf,

        /// Port to listen on
        #[arg(short, long, default_value = "3000", env = "ASREVIEW_PORT")]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "asreview_rank=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = RankingConfig::from_env();

    let result = match cli.command {
        Commands::Parse {
            input,
            format,
            output,
        } => cmd_parse(&input, format, output.as_deref()),

        Commands::Rank {
            library,
            collection,
        } => cmd_rank(&library, collection.map(CollectionId), config).await,

        Commands::Serve { library, port } => cmd_serve(library, port, config).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_parse(
    input: &Path,
    format: Format,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing ranking file: {}", input.display());

    let table = parse_ranking_file(input)?;

    eprintln!("   Delimiter: '{}'", format_delimiter(table.delimiter));
    eprintln!("   Columns: {}", table.headers.join(", "));
    eprintln!("✅ Parsed {} rows", table.len());

    let content = match format {
        Format::Json => serde_json::to_string_pretty(&table.rows)?,
        Format::Csv => write_ranking_table(&table, table.delimiter)?,
    };
    write_output(&content, output)?;

    Ok(())
}

async fn cmd_rank(
    library_path: &Path,
    only: Option<CollectionId>,
    config: RankingConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let library = Arc::new(SnapshotLibrary::open(library_path).await?);
    let cache = RankingCache::new(Arc::clone(&library), Arc::new(FsStore), config);
    cache.initialize().await;

    let collections = match only {
        Some(collection) => vec![collection],
        None => cache.collections(),
    };

    if collections.is_empty() {
        eprintln!("📋 No collection has a '{}' attachment.", cache.config().attachment_title);
        return Ok(());
    }

    for collection in collections {
        let name = library.collection_name(collection);
        println!("📁 Collection {} {}", collection, name);

        if cache.ranking(collection).is_none() {
            println!("   (no ranking)\n");
            continue;
        }

        let mut rows = Vec::new();
        for item in library.collection_items(collection).await? {
            if !item.is_regular() {
                continue;
            }
            if let Some(rank) = cache.lookup(collection, item.id).rank() {
                rows.push((rank, item));
            }
        }
        rows.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        for (_, item) in &rows {
            println!(
                "   {:>6}  {:>8}  {}",
                cache.cell_text(collection, item.id),
                item.id,
                item.title()
            );
        }
        println!();
    }

    Ok(())
}

async fn cmd_serve(
    library: PathBuf,
    port: u16,
    config: RankingConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    asreview_rank::server::start_server(library, port, config).await?;
    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
