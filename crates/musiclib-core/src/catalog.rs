//! External collaborators: the catalog service and the identity provider.
//!
//! The core never talks to the network directly. Everything it reads or
//! mutates goes through [`CatalogService`], which lets the curator and the
//! playlist library be tested without a live backend. [`crate::client`]
//! provides the HTTP implementation.

use async_trait::async_trait;

use crate::error::{CatalogError, Error, Result};
use crate::model::{Identity, PlaylistId, PlaylistSummary, SearchResults, Song, SongId};

/// Result type for catalog calls.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Operations offered by the remote catalog.
///
/// Playlist operations are scoped by the identity passed in; the service
/// never reads ambient session state.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// List every song in the catalog.
    async fn list_catalog_songs(&self) -> CatalogResult<Vec<Song>>;

    /// List the songs of a playlist, in server order.
    async fn list_playlist_songs(
        &self,
        identity: &Identity,
        playlist: &PlaylistId,
    ) -> CatalogResult<Vec<Song>>;

    /// Add a batch of songs to a playlist in one request.
    async fn add_songs_to_playlist(
        &self,
        identity: &Identity,
        playlist: &PlaylistId,
        song_ids: &[SongId],
    ) -> CatalogResult<()>;

    /// Rename a playlist. Name clashes surface as [`CatalogError::Conflict`].
    async fn rename_playlist(
        &self,
        identity: &Identity,
        playlist: &PlaylistId,
        new_name: &str,
    ) -> CatalogResult<()>;

    /// Delete a playlist.
    async fn delete_playlist(&self, identity: &Identity, playlist: &PlaylistId)
    -> CatalogResult<()>;

    /// List the playlists visible to the identity.
    async fn list_playlists(&self, identity: &Identity) -> CatalogResult<Vec<PlaylistSummary>>;

    /// Search songs, albums and artists.
    async fn search(&self, query: &str) -> CatalogResult<SearchResults>;

    /// Ask the server to generate a playlist from a seed song.
    async fn generate_playlist(
        &self,
        identity: &Identity,
        seed: &SongId,
        name: &str,
    ) -> CatalogResult<PlaylistSummary>;
}

/// Source of the signed-in identity.
#[cfg_attr(test, mockall::automock)]
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user, if any.
    fn current_identity(&self) -> Option<Identity>;
}

/// Identity provider with a fixed value, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    identity: Option<Identity>,
}

impl StaticIdentity {
    /// A provider that reports the given user as signed in.
    pub fn signed_in(display_name: impl Into<String>) -> Self {
        Self {
            identity: Some(Identity::new(display_name)),
        }
    }

    /// A provider with nobody signed in.
    #[must_use]
    pub const fn signed_out() -> Self {
        Self { identity: None }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_identity(&self) -> Option<Identity> {
        self.identity.clone()
    }
}

/// Resolve the signed-in identity or fail with [`Error::NotSignedIn`].
pub fn require_identity(provider: &dyn IdentityProvider) -> Result<Identity> {
    provider.current_identity().ok_or(Error::NotSignedIn)
}
