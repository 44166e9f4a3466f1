//! HTTP implementation of [`CatalogService`].
//!
//! Talks to the music-library REST API. Playlists are addressed by owner
//! display name and playlist name, passed as query parameters or JSON body
//! fields depending on the endpoint.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::{CatalogResult, CatalogService};
use crate::config::AppConfig;
use crate::error::CatalogError;
use crate::model::{Identity, PlaylistId, PlaylistSummary, SearchResults, Song, SongId};

#[derive(Debug, Deserialize)]
struct SongsResponse {
    #[serde(default)]
    songs: Vec<Song>,
}

#[derive(Debug, Deserialize)]
struct PlaylistsResponse {
    #[serde(default)]
    playlists: Vec<PlaylistSummary>,
}

#[derive(Debug, Serialize)]
struct AddSongsRequest<'a> {
    username: &'a str,
    playlist_name: &'a str,
    song_ids: &'a [SongId],
}

#[derive(Debug, Serialize)]
struct RenamePlaylistRequest<'a> {
    username: &'a str,
    playlist_name: &'a str,
    new_name: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    username: &'a str,
    song_id: &'a SongId,
    name: &'a str,
}

/// Catalog client backed by the REST API.
#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    http: Client,
    base_url: String,
}

impl HttpCatalogClient {
    /// Create a client for the API at `base_url` with default timeouts.
    pub fn new(base_url: &str) -> CatalogResult<Self> {
        Self::from_config(&AppConfig {
            api_base_url: base_url.to_string(),
            ..AppConfig::default()
        })
    }

    /// Create a client from the application configuration.
    pub fn from_config(config: &AppConfig) -> CatalogResult<Self> {
        let base_url = normalize_base_url(&config.api_base_url)?;

        let http = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(format!("MusicLib/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CatalogError::Request(e.to_string()))?;

        info!(base_url = %base_url, "Created catalog client");

        Ok(Self { http, base_url })
    }

    /// The normalized API base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl CatalogService for HttpCatalogClient {
    async fn list_catalog_songs(&self) -> CatalogResult<Vec<Song>> {
        let url = self.url("/database/songs");
        debug!(url = %url, "Fetching catalog songs");

        let response = self.http.get(&url).send().await?;
        let body: SongsResponse = parse_json(response, "catalog songs").await?;

        debug!(songs = body.songs.len(), "Fetched catalog songs");
        Ok(body.songs)
    }

    async fn list_playlist_songs(
        &self,
        identity: &Identity,
        playlist: &PlaylistId,
    ) -> CatalogResult<Vec<Song>> {
        let url = self.url("/database/playlists/songs");
        debug!(url = %url, playlist = %playlist, "Fetching playlist songs");

        let response = self
            .http
            .get(&url)
            .query(&[
                ("username", identity.display_name.as_str()),
                ("playlist_name", playlist.as_str()),
            ])
            .send()
            .await?;
        let songs: Vec<Song> = parse_json(response, "playlist songs").await?;

        debug!(playlist = %playlist, songs = songs.len(), "Fetched playlist songs");
        Ok(songs)
    }

    async fn add_songs_to_playlist(
        &self,
        identity: &Identity,
        playlist: &PlaylistId,
        song_ids: &[SongId],
    ) -> CatalogResult<()> {
        let url = self.url("/database/playlists/songs");
        debug!(url = %url, playlist = %playlist, count = song_ids.len(), "Adding songs");

        let body = AddSongsRequest {
            username: &identity.display_name,
            playlist_name: playlist.as_str(),
            song_ids,
        };
        let response = self.http.post(&url).json(&body).send().await?;
        expect_success(response).await
    }

    async fn rename_playlist(
        &self,
        identity: &Identity,
        playlist: &PlaylistId,
        new_name: &str,
    ) -> CatalogResult<()> {
        let url = self.url("/database/playlists/rename");
        debug!(url = %url, playlist = %playlist, new_name = %new_name, "Renaming playlist");

        let body = RenamePlaylistRequest {
            username: &identity.display_name,
            playlist_name: playlist.as_str(),
            new_name,
        };
        let response = self.http.put(&url).json(&body).send().await?;
        expect_success(response).await
    }

    async fn delete_playlist(
        &self,
        identity: &Identity,
        playlist: &PlaylistId,
    ) -> CatalogResult<()> {
        let url = self.url("/database/playlists");
        debug!(url = %url, playlist = %playlist, "Deleting playlist");

        let response = self
            .http
            .delete(&url)
            .query(&[
                ("username", identity.display_name.as_str()),
                ("playlist_name", playlist.as_str()),
            ])
            .send()
            .await?;
        expect_success(response).await
    }

    async fn list_playlists(&self, identity: &Identity) -> CatalogResult<Vec<PlaylistSummary>> {
        let url = self.url("/database/playlists");
        debug!(url = %url, "Fetching playlists");

        let response = self
            .http
            .get(&url)
            .query(&[("username", identity.display_name.as_str())])
            .send()
            .await?;
        let body: PlaylistsResponse = parse_json(response, "playlists").await?;
        Ok(body.playlists)
    }

    async fn search(&self, query: &str) -> CatalogResult<SearchResults> {
        let url = self.url("/database/search");
        debug!(url = %url, query = %query, "Searching catalog");

        let response = self.http.get(&url).query(&[("q", query)]).send().await?;
        parse_json(response, "search results").await
    }

    async fn generate_playlist(
        &self,
        identity: &Identity,
        seed: &SongId,
        name: &str,
    ) -> CatalogResult<PlaylistSummary> {
        let url = self.url("/api/v1/songs/generate");
        debug!(url = %url, seed = %seed, name = %name, "Generating playlist");

        let body = GenerateRequest {
            username: &identity.display_name,
            song_id: seed,
            name,
        };
        let response = self.http.post(&url).json(&body).send().await?;
        parse_json(response, "generated playlist").await
    }
}

/// Validate the scheme and strip trailing slashes.
fn normalize_base_url(url: &str) -> CatalogResult<String> {
    let url = url.trim();
    if url.is_empty() {
        return Err(CatalogError::InvalidUrl("URL cannot be empty".into()));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(CatalogError::InvalidUrl(
            "URL must start with http:// or https://".into(),
        ));
    }
    Ok(url.trim_end_matches('/').to_string())
}

/// Map a non-success status to a catalog error.
async fn status_error(response: Response) -> CatalogError {
    let status = response.status();
    let message = response.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), message = %message, "Catalog request failed");

    match status {
        StatusCode::NOT_FOUND => CatalogError::NotFound(message),
        StatusCode::CONFLICT => CatalogError::Conflict(message),
        _ => CatalogError::Server {
            status: status.as_u16(),
            message,
        },
    }
}

async fn expect_success(response: Response) -> CatalogResult<()> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(status_error(response).await)
    }
}

async fn parse_json<T: DeserializeOwned>(response: Response, what: &str) -> CatalogResult<T> {
    if !response.status().is_success() {
        return Err(status_error(response).await);
    }
    response
        .json()
        .await
        .map_err(|e| CatalogError::Parse(format!("Failed to parse {what}: {e}")))
}
