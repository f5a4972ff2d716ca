//! Track Catalog
//!
//! The playable tracks a deployment serves. Built once at startup from a
//! media directory scan or a static catalog file, then immutable for the
//! process lifetime, which keeps track ids stable across requests.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::{info, warn};

/// File extensions recognized as playable audio
pub const ALLOWED_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a"];

/// One playable audio item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Stable identifier, assigned sequentially from 1 on scan
    pub id: u32,
    pub filename: String,
    pub title: String,
    /// Where clients fetch the audio from
    pub url: String,
}

/// Immutable list of playable tracks
#[derive(Debug, Clone, Default)]
pub struct TrackCatalog {
    tracks: Vec<Track>,
}

impl TrackCatalog {
    pub fn from_tracks(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    /// Scan a media directory for playable files.
    ///
    /// Files are filtered by extension (case-insensitive), sorted by name,
    /// and numbered from 1. An unreadable directory yields an empty
    /// catalog rather than a startup failure.
    pub async fn scan_dir(dir: &Path, base_url: &str) -> Self {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    dir = %dir.display(),
                    error = %e,
                    "Media directory unreadable, serving empty catalog"
                );
                return Self::default();
            }
        };

        let mut names = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Some(name) = entry.file_name().to_str() {
                if has_allowed_extension(name) {
                    names.push(name.to_string());
                }
            }
        }

        names.sort();

        let base = base_url.trim_end_matches('/');
        let tracks: Vec<Track> = names
            .into_iter()
            .enumerate()
            .map(|(index, filename)| {
                let title = Path::new(&filename)
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .unwrap_or(&filename)
                    .to_string();

                Track {
                    id: index as u32 + 1,
                    url: format!("{}/{}", base, filename),
                    title,
                    filename,
                }
            })
            .collect();

        info!(count = tracks.len(), dir = %dir.display(), "Track catalog scanned");
        Self { tracks }
    }

    /// Load a static catalog file: a JSON array of tracks with explicit ids
    pub async fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read catalog file {}", path.display()))?;

        let tracks: Vec<Track> =
            serde_json::from_str(&raw).context("Invalid catalog file format")?;

        info!(count = tracks.len(), path = %path.display(), "Track catalog loaded");
        Ok(Self { tracks })
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn get(&self, id: u32) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

fn has_allowed_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let lower = ext.to_lowercase();
            ALLOWED_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}
