//! Read-only HTTP view of the snapshot directory
//!
//! `GET /` renders one section per configured client with a link for every
//! artifact and latest pointer; `GET /snapshots/{client}/{file}` streams the
//! file itself. Pointers are followed when served.

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use snapshotter::constants::snapshot::PARTIAL_SUFFIX;
use snapshotter::Config;
use std::fmt::Write as _;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub async fn start_server(config: Arc<Config>) -> Result<()> {
    let app = create_router(config.clone());
    let addr = format!("{}:{}", config.host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("File server running on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn create_router(config: Arc<Config>) -> Router {
    Router::new()
        .route("/", get(list_snapshots))
        .nest_service("/snapshots", ServeDir::new(&config.snapshot_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(config)
}

async fn list_snapshots(State(config): State<Arc<Config>>) -> Response {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Snapshots</title></head>\n<body>\n<h1>Available snapshots</h1>\n",
    );

    for node in &config.nodes {
        let dir = config.client_dir(&node.name);
        let files = match list_client_files(&dir).await {
            Ok(files) => files,
            Err(e) => {
                error!("Failed to list {}: {}", dir.display(), e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to list snapshots for {}", node.name),
                )
                    .into_response();
            }
        };

        let _ = writeln!(
            html,
            "<h2>{} ({})</h2>\n<ul>",
            escape_html(&node.name),
            escape_html(&node.snapshot_type)
        );
        for file in &files {
            let _ = writeln!(
                html,
                "<li><a href=\"/snapshots/{}/{}\">{}</a></li>",
                encode_segment(&node.name),
                encode_segment(file),
                escape_html(file)
            );
        }
        html.push_str("</ul>\n");
    }

    html.push_str("</body>\n</html>\n");
    Html(html).into_response()
}

/// Sorted names of the downloadable entries in one client directory. Hidden
/// files (temporary pointer links) and in-progress archives are left out. A
/// directory that does not exist yet has no entries.
async fn list_client_files(dir: &Path) -> io::Result<Vec<String>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || name.ends_with(PARTIAL_SUFFIX) {
            continue;
        }
        if entry.file_type().await?.is_dir() {
            continue;
        }
        files.push(name);
    }
    files.sort();
    Ok(files)
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Percent-encode everything outside the RFC 3986 unreserved set
fn encode_segment(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            _ => {
                let _ = write!(encoded, "%{:02X}", byte);
            }
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("geth_pruned_latest.tar.lz4"), "geth_pruned_latest.tar.lz4");
        assert_eq!(encode_segment("a b#c"), "a%20b%23c");
    }
}
