//! Catalog data model.
//!
//! Songs, albums, artists and playlists are owned by the remote catalog and
//! are immutable on the client. Every one of them can be the target of a
//! confirm gesture, which is expressed through the [`Selectable`] trait.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Read an id that the backend may send as a JSON string or integer.
fn string_or_integer<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct IdVisitor;

    impl Visitor<'_> for IdVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string or integer id")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(IdVisitor)
}

/// Opaque, stable song identifier.
///
/// Integer ids from the backend are kept in their decimal form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SongId(String);

impl<'de> Deserialize<'de> for SongId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        string_or_integer(deserializer).map(Self)
    }
}

impl SongId {
    /// Create a song id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SongId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SongId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Playlist identifier.
///
/// The catalog addresses playlists by owner and name, so the id wraps the
/// playlist name and changes when the playlist is renamed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaylistId(String);

impl PlaylistId {
    /// Create a playlist id.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The playlist name this id refers to.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlaylistId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A song in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    /// Song id.
    pub id: SongId,
    /// Song title.
    #[serde(alias = "title")]
    pub name: String,
    /// Performing artist.
    #[serde(default)]
    pub artist: String,
    /// Cover art.
    #[serde(default, rename = "image", alias = "album_url")]
    pub image_url: Option<String>,
}

impl Song {
    /// Create a song without artwork.
    pub fn new(id: impl Into<String>, name: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            id: SongId::new(id),
            name: name.into(),
            artist: artist.into(),
            image_url: None,
        }
    }
}

/// An album in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    /// Album id.
    #[serde(deserialize_with = "string_or_integer")]
    pub id: String,
    /// Album title.
    #[serde(alias = "title")]
    pub name: String,
    /// Album artist.
    #[serde(default)]
    pub artist: String,
    /// Cover art.
    #[serde(default, rename = "image")]
    pub image_url: Option<String>,
}

/// An artist in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    /// Artist id.
    #[serde(deserialize_with = "string_or_integer")]
    pub id: String,
    /// Artist name.
    pub name: String,
    /// Artist picture.
    #[serde(default, rename = "image")]
    pub image_url: Option<String>,
}

/// A playlist owned by the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSummary {
    /// Playlist name, unique per owner.
    pub name: String,
    /// Playlist artwork.
    #[serde(default, rename = "image")]
    pub image_url: Option<String>,
}

impl PlaylistSummary {
    /// Create a playlist summary without artwork.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image_url: None,
        }
    }

    /// Id used to address this playlist.
    #[must_use]
    pub fn id(&self) -> PlaylistId {
        PlaylistId::new(self.name.clone())
    }
}

/// Search results across songs, albums and artists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    /// Matching songs.
    #[serde(default)]
    pub songs: Vec<Song>,
    /// Matching albums.
    #[serde(default)]
    pub albums: Vec<Album>,
    /// Matching artists.
    #[serde(default)]
    pub artists: Vec<Artist>,
}

impl SearchResults {
    /// True when nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.songs.is_empty() && self.albums.is_empty() && self.artists.is_empty()
    }
}

/// The signed-in user, as seen by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Display name; playlists are scoped by it.
    pub display_name: String,
}

impl Identity {
    /// Create an identity.
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
        }
    }
}

/// Kind of a selectable catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// A song.
    Song,
    /// An album.
    Album,
    /// An artist.
    Artist,
    /// A playlist.
    Playlist,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Song => write!(f, "song"),
            Self::Album => write!(f, "album"),
            Self::Artist => write!(f, "artist"),
            Self::Playlist => write!(f, "playlist"),
        }
    }
}

/// Identity of a selectable item: ids are only unique within their kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey {
    /// Item kind.
    pub kind: ItemKind,
    /// Id within the kind.
    pub id: String,
}

impl ItemKey {
    /// Create an item key.
    pub fn new(kind: ItemKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Any catalog object a user can act on through a card.
pub trait Selectable {
    /// Stable identity of the item.
    fn item_key(&self) -> ItemKey;

    /// Name shown on the card.
    fn display_name(&self) -> &str;

    /// Optional thumbnail.
    fn thumbnail_url(&self) -> Option<&str>;
}

impl Selectable for Song {
    fn item_key(&self) -> ItemKey {
        ItemKey::new(ItemKind::Song, self.id.as_str())
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn thumbnail_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }
}

impl Selectable for Album {
    fn item_key(&self) -> ItemKey {
        ItemKey::new(ItemKind::Album, self.id.as_str())
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn thumbnail_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }
}

impl Selectable for Artist {
    fn item_key(&self) -> ItemKey {
        ItemKey::new(ItemKind::Artist, self.id.as_str())
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn thumbnail_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }
}

impl Selectable for PlaylistSummary {
    fn item_key(&self) -> ItemKey {
        ItemKey::new(ItemKind::Playlist, self.name.as_str())
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn thumbnail_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }
}
