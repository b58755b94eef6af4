//! # wikiweb-core
//!
//! Core library for the wikiweb content engine.
//!
//! This crate provides the versioned page store organized into webs, the
//! advisory edit locks, the markup dialects that derive categories and links,
//! the link graph used for orphan detection, and text search.

pub mod config;
pub mod error;
pub mod graph;
pub mod markup;
pub mod models;
pub mod page;
pub mod search;
pub mod service;
pub mod storage;
pub mod web;

pub use config::{Config, ConfigError};
pub use error::{Result, WikiError};
pub use graph::LinkGraph;
pub use markup::{Markup, MarkupKind, MarkupProcessor, ParsedContent, RenderContext};
pub use models::{Author, Lock, Revision};
pub use page::{Edit, Page};
pub use search::{SearchEngine, SearchHit};
pub use service::{SharedWeb, WebSettingsUpdate, WikiService};
pub use storage::{JsonFileStorage, NoPersistence, Storage, StorageError, SystemState};
pub use web::{Web, WebSettings};
