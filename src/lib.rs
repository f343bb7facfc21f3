//! Novelcrawl Core Library
//!
//! Discovers, refreshes and archives serialized web novels from catalogs
//! that address books by sequential integer ids.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`client`] - Resilient HTTP fetching (gate, circuit breaker, weighted retry)
//! - [`config`] - YAML site configuration and validation
//! - [`db`] - Database connection and schema management
//! - [`model`] - Book, writer and chapter records
//! - [`parser`] - Field extraction from catalog HTML
//! - [`repo`] - Book persistence contract and its SQLite implementation
//! - [`service`] - Book lifecycle engine (explore, update, validate, download)

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod db;
pub mod model;
pub mod parser;
pub mod repo;
pub mod service;
mod user_agent;

// Re-export commonly used types
pub use client::{BookClient, ClientConfig, FetchError, FetchResponse, ResilientClient};
pub use config::{Config, ConfigError, SiteConfig};
pub use db::{Database, DbError};
pub use model::{Book, BookStatus, Chapter, Writer};
pub use parser::{Parser, SelectorParser};
pub use repo::{BookRepository, RepoError, SqliteBookRepository, Summary};
pub use service::{BatchReport, ProcessReport, ServiceError, SiteService};
