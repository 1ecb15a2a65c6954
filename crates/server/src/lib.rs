//! routerag Server - HTTP API for retrieval-augmented chat
//!
//! Exposes the routerag pipeline over HTTP:
//!
//! - **Uploads**: PDF and GPX files are parsed, chunked, embedded and stored,
//!   tagged with their file name
//! - **Search**: similarity search across every stored chunk
//! - **Chat**: answers grounded in one document, or a comparison of two,
//!   streamed as plain text
//! - **Files**: listing of known documents and download of the originals
//! - **Health**: API and vector database status
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `GET /` - API information
//! - `POST /api/chat` - Streamed chat over one or two documents
//! - `POST /api/upload_pdf` - Upload a PDF (multipart field `file`)
//! - `POST /api/upload_gpx` - Upload a GPX route (multipart field `file`)
//! - `POST /api/search` - Top-k chunk search
//! - `GET /api/files` - Stored document names
//! - `GET /api/file/{name}` - Download an uploaded file
//! - `GET /api/health` - Liveness plus vector database status
//!
//! Errors are returned as `{"detail": "..."}`.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
