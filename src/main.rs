//! citegraph - Zotero + Crossref citation graph builder
//!
//! Builds a Graphviz DOT citation graph restricted to the papers in one or
//! more Zotero collections.
//!
//! ## Usage
//!
//! ### CLI Mode
//! ```bash
//! citegraph graph "Collection 1" "Collection 2" --output graph.dot
//! ```
//!
//! ### HTTP Server Mode
//! ```bash
//! citegraph serve --port 3000
//! ```

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use citegraph::{
    config::Settings,
    crossref::CrossrefClient,
    graph::{BuildOptions, GraphBuilder, UnresolvedCollection},
    zotero::ZoteroClient,
};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Zotero + Crossref citation graph builder
#[derive(Parser)]
#[command(name = "citegraph")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the citation graph of one or more collections
    Graph {
        /// Collection names
        #[arg(required = true)]
        collections: Vec<String>,

        /// Output file (DOT); stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fail if a collection name does not exist instead of skipping it
        #[arg(long)]
        strict: bool,

        /// Concurrent Crossref lookups
        #[arg(long, default_value = "1")]
        concurrency: usize,

        /// Drop edges from a paper to itself
        #[arg(long)]
        skip_self_citations: bool,

        /// Contact email for the Crossref polite pool (overrides CROSSREF_MAILTO)
        #[arg(long)]
        mailto: Option<String>,
    },

    /// List the collections of the configured library
    Collections,

    /// Run as HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Concurrent Crossref lookups per request
        #[arg(long, default_value = "3")]
        concurrency: usize,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout may carry the graph.
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();

    let mut settings = Settings::from_env().context("Invalid configuration")?;

    match cli.command {
        Commands::Graph {
            collections,
            output,
            strict,
            concurrency,
            skip_self_citations,
            mailto,
        } => {
            if let Some(mailto) = mailto {
                settings.crossref_mailto = mailto;
            }
            let options = BuildOptions {
                unresolved: if strict {
                    UnresolvedCollection::Fail
                } else {
                    UnresolvedCollection::Skip
                },
                concurrency,
                skip_self_citations,
            };
            run_graph(&settings, &collections, options, output).await
        }
        Commands::Collections => list_collections(&settings).await,
        Commands::Serve {
            port,
            host,
            concurrency,
        } => run_server(settings, host, port, concurrency).await,
    }
}

// ============================================================================
// Graph Command
// ============================================================================

async fn run_graph(
    settings: &Settings,
    collections: &[String],
    options: BuildOptions,
    output: Option<PathBuf>,
) -> Result<()> {
    let library = ZoteroClient::new(&settings.zotero)?;
    let citations = CrossrefClient::new(&settings.crossref_mailto, options.concurrency)?;

    let builder = GraphBuilder::new(library, citations).with_options(options);
    let graph = builder
        .build(collections)
        .await
        .context("Failed to build citation graph")?;

    match &output {
        Some(path) => {
            std::fs::write(path, graph.to_dot())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Graph written to {}", path.display());
        }
        None => print!("{}", graph),
    }

    let stats = graph.stats();
    eprintln!(
        "Collections: {} resolved, {} skipped",
        stats.collections_resolved, stats.collections_skipped
    );
    eprintln!(
        "Papers: {} seen, {} without DOI, {} malformed",
        stats.papers_seen, stats.papers_without_doi, stats.malformed_items
    );
    eprintln!(
        "Graph: {} nodes, {} edges ({} lookups failed, {} external references dropped)",
        graph.nodes().len(),
        graph.edges().len(),
        stats.failed_lookups,
        stats.external_references
    );

    Ok(())
}

// ============================================================================
// Collections Command
// ============================================================================

async fn list_collections(settings: &Settings) -> Result<()> {
    let library = ZoteroClient::new(&settings.zotero)?;
    let collections = library
        .collections()
        .await
        .context("Failed to list collections")?;

    if collections.is_empty() {
        println!("No collections found.");
        return Ok(());
    }

    for collection in collections {
        println!("{}\t{}", collection.key, collection.name);
    }
    Ok(())
}

// ============================================================================
// HTTP Server
// ============================================================================

async fn run_server(settings: Settings, host: String, port: u16, concurrency: usize) -> Result<()> {
    info!(host = %host, port = port, "Starting HTTP server");

    let citations = CrossrefClient::new(&settings.crossref_mailto, concurrency)?;
    let app_state = Arc::new(AppState {
        settings,
        citations: Arc::new(citations),
        concurrency,
    });

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/graph", post(graph_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid host:port")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    eprintln!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}

struct AppState {
    settings: Settings,
    /// Shared so the Crossref request cap holds across requests.
    citations: Arc<CrossrefClient>,
    concurrency: usize,
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

/// Graph request body
#[derive(Debug, Deserialize)]
struct GraphRequest {
    collections: Vec<String>,
    #[serde(default)]
    strict: bool,
    #[serde(default)]
    skip_self_citations: bool,
}

/// Graph endpoint handler: responds with DOT text
async fn graph_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GraphRequest>,
) -> Response {
    info!(collections = ?req.collections, strict = req.strict, "Graph request");

    // A fresh library client per request, so new collections are seen.
    let library = match ZoteroClient::new(&state.settings.zotero) {
        Ok(library) => library,
        Err(e) => {
            error!(error = %e, "Failed to create Zotero client");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    let options = BuildOptions {
        unresolved: if req.strict {
            UnresolvedCollection::Fail
        } else {
            UnresolvedCollection::Skip
        },
        concurrency: state.concurrency,
        skip_self_citations: req.skip_self_citations,
    };
    let builder = GraphBuilder::new(library, Arc::clone(&state.citations)).with_options(options);

    match builder.build(&req.collections).await {
        Ok(graph) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/vnd.graphviz")],
            graph.to_dot(),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Graph build failed");
            let status = if e.is_client_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::BAD_GATEWAY
            };
            (status, e.to_string()).into_response()
        }
    }
}
