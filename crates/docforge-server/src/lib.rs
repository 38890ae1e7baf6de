//! docforge-server: HTTP front end for the docforge merge engine
//!
//! This crate provides:
//! - Template resolution across an ordered list of deployment layouts
//! - Redaction of request payloads before they are logged
//! - Document assembly on the blocking thread pool
//! - An axum router that maps every failure to a JSON error body

pub mod assembler;
pub mod compose;
pub mod config;
pub mod error;
pub mod registry;
pub mod resolver;
pub mod sanitize;
pub mod server;

pub use assembler::{DocumentAssembler, GeneratedDocument};
pub use config::ServerConfig;
pub use error::{Result, ServiceError, TagFailure};
pub use registry::TemplateRegistry;
pub use resolver::{CandidateRoot, CandidateRoots, TemplateBytes, TemplateResolver};
pub use server::{AppState, SharedState, build_router, run_server};
