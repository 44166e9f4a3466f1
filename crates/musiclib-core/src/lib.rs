//! MusicLib Core Library
//!
//! This crate provides the client-side core of the MusicLib music library:
//! - Two-step confirm gestures for destructive or navigating card clicks
//! - Catalog-diff curation: add songs a playlist does not have yet
//! - Playlist management (rename, delete, generate from a seed song, search)
//! - An HTTP client for the catalog REST API

pub mod catalog;
pub mod client;
pub mod config;
pub mod curator;
pub mod error;
pub mod gesture;
pub mod library;
pub mod logging;
pub mod model;

pub use catalog::{CatalogService, IdentityProvider, StaticIdentity, require_identity};
pub use client::HttpCatalogClient;
pub use config::AppConfig;
pub use curator::{CommitReceipt, CurationSession, Curator, CuratorEvent, SubmissionState};
pub use error::{CatalogError, CuratorError, Error, ErrorKind, PlaylistError, Result};
pub use gesture::{ClickOutcome, ConfirmGesture, GestureBoard, GestureEvent, GestureState};
pub use library::PlaylistLibrary;
pub use model::{Identity, ItemKey, ItemKind, PlaylistId, Selectable, Song, SongId};
