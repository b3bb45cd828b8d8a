//! doc2md MCP server binary.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use doc2md_mcp::McpServer;

/// MCP server converting PDF, DOCX, and PPTX documents to Markdown.
#[derive(Parser, Debug)]
#[command(name = "doc2md-mcp", version, about)]
struct Cli {
    /// Log filter, e.g. "doc2md_mcp=debug" (overrides RUST_LOG)
    #[arg(long)]
    log_filter: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> doc2md_mcp::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.log_filter {
        Some(f) => EnvFilter::new(f),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("doc2md_mcp=info")),
    };
    // stdout carries the protocol; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut server = McpServer::new();
    server.run().await
}
