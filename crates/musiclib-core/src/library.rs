//! Playlist management on top of the catalog service.
//!
//! Every read goes to the server. Mutations return what the caller needs to
//! re-fetch, never a locally patched copy.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::catalog::CatalogService;
use crate::error::{CatalogError, Error, PlaylistError, Result};
use crate::model::{Identity, PlaylistId, PlaylistSummary, SearchResults, Song};

/// Maximum playlist name length, in characters.
pub const MAX_PLAYLIST_NAME_LEN: usize = 255;

/// Validate a playlist name. The name is expected to be trimmed already.
pub fn validate_playlist_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "Playlist name cannot be empty"
    } else if name.chars().count() > MAX_PLAYLIST_NAME_LEN {
        "Playlist name too long"
    } else if name.chars().any(char::is_control) {
        "Playlist name contains invalid characters"
    } else {
        return Ok(());
    };

    Err(PlaylistError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    }
    .into())
}

/// Playlist operations for a signed-in user.
pub struct PlaylistLibrary<C: ?Sized> {
    catalog: Arc<C>,
}

impl<C> PlaylistLibrary<C>
where
    C: CatalogService + ?Sized,
{
    /// Create a library backed by `catalog`.
    pub const fn new(catalog: Arc<C>) -> Self {
        Self { catalog }
    }

    /// Playlists visible to `identity`.
    pub async fn list_playlists(&self, identity: &Identity) -> Result<Vec<PlaylistSummary>> {
        let playlists = self.catalog.list_playlists(identity).await?;
        debug!(user = %identity.display_name, count = playlists.len(), "Listed playlists");
        Ok(playlists)
    }

    /// The songs of a playlist as the server reports them.
    pub async fn playlist_songs(&self, identity: &Identity, id: &PlaylistId) -> Result<Vec<Song>> {
        self.catalog
            .list_playlist_songs(identity, id)
            .await
            .map_err(|e| not_found_as_playlist(e, id))
    }

    /// Rename a playlist and return its new id.
    ///
    /// Renaming to the current name is a no-op and makes no request.
    pub async fn rename(
        &self,
        identity: &Identity,
        id: &PlaylistId,
        new_name: &str,
    ) -> Result<PlaylistId> {
        let new_name = new_name.trim();
        validate_playlist_name(new_name)?;

        if new_name == id.as_str() {
            debug!(playlist = %id, "Rename to same name, nothing to do");
            return Ok(id.clone());
        }

        info!(playlist = %id, new_name = %new_name, "Renaming playlist");
        self.catalog
            .rename_playlist(identity, id, new_name)
            .await
            .map_err(|e| match e {
                CatalogError::Conflict(_) => {
                    warn!(new_name = %new_name, "Playlist name already taken");
                    PlaylistError::NameConflict {
                        name: new_name.to_string(),
                    }
                    .into()
                }
                other => not_found_as_playlist(other, id),
            })?;

        Ok(PlaylistId::new(new_name))
    }

    /// Delete a playlist.
    pub async fn delete(&self, identity: &Identity, id: &PlaylistId) -> Result<()> {
        info!(playlist = %id, "Deleting playlist");
        self.catalog
            .delete_playlist(identity, id)
            .await
            .map_err(|e| not_found_as_playlist(e, id))
    }

    /// Ask the server to build a playlist around `seed`, named after its title.
    pub async fn generate_from_seed(&self, identity: &Identity, seed: &Song) -> Result<PlaylistSummary> {
        let name = seed.name.trim();
        validate_playlist_name(name)?;

        info!(seed = %seed.id, name = %name, "Generating playlist from seed song");
        let playlist = self
            .catalog
            .generate_playlist(identity, &seed.id, name)
            .await?;
        Ok(playlist)
    }

    /// Search the catalog. A blank query returns nothing without a request.
    pub async fn search(&self, query: &str) -> Result<SearchResults> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(SearchResults::default());
        }

        let results = self.catalog.search(query).await?;
        debug!(
            query = %query,
            songs = results.songs.len(),
            albums = results.albums.len(),
            artists = results.artists.len(),
            "Search complete"
        );
        Ok(results)
    }
}

impl<C: ?Sized> std::fmt::Debug for PlaylistLibrary<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaylistLibrary").finish_non_exhaustive()
    }
}

fn not_found_as_playlist(e: CatalogError, id: &PlaylistId) -> Error {
    match e {
        CatalogError::NotFound(_) => PlaylistError::NotFound {
            name: id.as_str().to_string(),
        }
        .into(),
        other => other.into(),
    }
}
