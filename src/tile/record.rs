//! Per-tile display state kept by the controller.

use std::fmt;

use serde::Serialize;

use crate::geometry::PixelRect;

use super::name::TileName;

/// Whether a record is a tile of its own or a mirror of another tile.
///
/// Mirror tiles show the bottom half of the map by reflecting a tile from
/// the top half; they never render anything themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "of", rename_all = "snake_case")]
pub enum TileKind {
    Normal,
    MirrorOf(TileName),
}

/// What a tile currently displays: the image of `source`, placed at
/// `placement` in the tile's pixel space.
///
/// When `source` is the tile itself the placement covers the tile exactly;
/// for an ancestor it is the ancestor's (larger) rectangle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileView {
    pub source: TileName,
    pub placement: PixelRect,
}

/// Progress of a tile through lookup, rendering and saving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileStatus {
    New,
    /// Showing its own image before it is known to exist.
    Loading,
    /// Showing a cropped ancestor while the real tile is pending.
    Displaying(TileName),
    /// Found in the persistent store.
    Available,
    /// Showing its own stored image.
    Loaded,
    Queued,
    Rendered,
    RenderFailed(String),
    Saved,
    SaveFailed(String),
}

impl fmt::Display for TileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileStatus::New => write!(f, "new"),
            TileStatus::Loading => write!(f, "loading"),
            TileStatus::Displaying(source) => write!(f, "displaying {}", source),
            TileStatus::Available => write!(f, "available"),
            TileStatus::Loaded => write!(f, "loaded"),
            TileStatus::Queued => write!(f, "queued"),
            TileStatus::Rendered => write!(f, "rendered"),
            TileStatus::RenderFailed(reason) => write!(f, "render failed ({})", reason),
            TileStatus::Saved => write!(f, "saved: ok"),
            TileStatus::SaveFailed(reason) => write!(f, "saved: failed ({})", reason),
        }
    }
}

impl Serialize for TileStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Cache entry for one tile name.
#[derive(Debug, Clone, Serialize)]
pub struct TileRecord {
    pub name: TileName,
    pub kind: TileKind,
    /// `None` until something can be shown.
    pub view: Option<TileView>,
    /// The tile's own image is known to be in the store (or just rendered).
    pub exists: bool,
    pub status: TileStatus,
}

impl TileRecord {
    pub fn new(name: TileName) -> Self {
        Self {
            name,
            kind: TileKind::Normal,
            view: None,
            exists: false,
            status: TileStatus::New,
        }
    }

    /// A mirror display of `original`, starting from the original's view.
    pub fn mirror_of(original: &TileRecord) -> Self {
        Self {
            name: original.name.clone(),
            kind: TileKind::MirrorOf(original.name.clone()),
            view: original.view.clone(),
            exists: original.exists,
            status: original.status.clone(),
        }
    }

    pub fn is_mirror(&self) -> bool {
        matches!(self.kind, TileKind::MirrorOf(_))
    }

    /// Whether the view shows the tile's own image rather than an ancestor.
    pub fn shows_own_image(&self) -> bool {
        self.view
            .as_ref()
            .is_some_and(|view| view.source == self.name)
    }
}
