//! Static catalog of meeting applications and background collections
//!
//! The catalog is read-only at runtime: two JSON documents (an application
//! registry and a background registry) are parsed once at startup into
//! immutable structs that get passed explicitly to the components that need
//! them. Unknown keys are rejected lazily, when a lookup actually uses them.

use crate::error::{BackgroundsError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Application registry document shipped with the binary
pub const DEFAULT_APPS_JSON: &str = include_str!("../data/apps.json");

/// Background registry document shipped with the binary
pub const DEFAULT_BACKGROUNDS_JSON: &str = include_str!("../data/backgrounds.json");

/// A meeting application and where it keeps its virtual backgrounds
///
/// `bg_dir` maps OS names (`"Windows"`, `"Darwin"`, `"Linux"`) to path
/// templates that may contain environment references (`%VAR%`, `$VAR`,
/// `${VAR}`). Applications that derive a thumbnail next to each background
/// carry a `bg_path_pattern` with `${BG_DIR}`, `${STEM}` and `${EXT}`
/// placeholders; applications that track installed backgrounds in a side
/// index carry a per-OS `metadata_db` template pointing at that index file.
#[derive(Debug, Clone, Deserialize)]
pub struct Application {
    pub bg_dir: BTreeMap<String, String>,
    #[serde(default)]
    pub bg_path_pattern: Option<String>,
    #[serde(default)]
    pub metadata_db: Option<BTreeMap<String, String>>,
}

/// A curated collection of background images
///
/// The order of `image_urls` is meaningful: install filenames derive from
/// it and stay stable across runs.
#[derive(Debug, Clone, Deserialize)]
pub struct BackgroundCollection {
    pub title: String,
    pub url: String,
    pub image_urls: Vec<String>,
}

/// Immutable catalog loaded once at process start
#[derive(Debug, Clone)]
pub struct Catalog {
    apps: BTreeMap<String, Application>,
    backgrounds: BTreeMap<String, BackgroundCollection>,
}

impl Catalog {
    /// Load the registries shipped with the binary
    ///
    /// # Errors
    /// - Malformed embedded documents (a packaging defect, but still fatal)
    pub fn load_default() -> Result<Self> {
        Self::from_json(DEFAULT_APPS_JSON, DEFAULT_BACKGROUNDS_JSON)
    }

    /// Parse a catalog from raw registry documents
    ///
    /// # Errors
    /// - Either document fails to parse as its registry shape
    pub fn from_json(apps_json: &str, backgrounds_json: &str) -> Result<Self> {
        let apps = serde_json::from_str(apps_json).map_err(|e| {
            BackgroundsError::catalog(format!("invalid application registry: {}", e))
        })?;
        let backgrounds = serde_json::from_str(backgrounds_json).map_err(|e| {
            BackgroundsError::catalog(format!("invalid background registry: {}", e))
        })?;
        Ok(Self { apps, backgrounds })
    }

    /// Look up an application by id
    ///
    /// # Errors
    /// - Unknown application id
    pub fn app(&self, id: &str) -> Result<&Application> {
        self.apps.get(id).ok_or_else(|| {
            BackgroundsError::catalog(format!(
                "unknown application \"{}\" (known: {})",
                id,
                join_keys(self.apps.keys())
            ))
        })
    }

    /// Look up a background collection by id
    ///
    /// # Errors
    /// - Unknown collection id
    pub fn background(&self, id: &str) -> Result<&BackgroundCollection> {
        self.backgrounds.get(id).ok_or_else(|| {
            BackgroundsError::catalog(format!(
                "unknown background collection \"{}\" (known: {})",
                id,
                join_keys(self.backgrounds.keys())
            ))
        })
    }

    /// All applications in stable (sorted) order
    pub fn apps(&self) -> impl Iterator<Item = (&str, &Application)> {
        self.apps.iter().map(|(id, app)| (id.as_str(), app))
    }

    /// All background collections in stable (sorted) order
    pub fn backgrounds(&self) -> impl Iterator<Item = (&str, &BackgroundCollection)> {
        self.backgrounds.iter().map(|(id, bg)| (id.as_str(), bg))
    }

    /// Ids of every known background collection (the `--bg` default)
    #[must_use]
    pub fn background_ids(&self) -> Vec<String> {
        self.backgrounds.keys().cloned().collect()
    }
}

fn join_keys<'a>(keys: impl Iterator<Item = &'a String>) -> String {
    keys.map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// Install filename for one image of a collection
///
/// Filenames are namespaced by collection id so that removing one
/// collection never touches another's files in a shared directory.
#[must_use]
pub fn background_file_name(collection_id: &str, url: &str) -> String {
    let basename = url.rsplit('/').next().unwrap_or(url);
    format!("{}_{}", collection_id, basename)
}

/// Expand an application's thumbnail pattern for one installed file
///
/// Thumbnails are produced by the meeting application itself; this tool
/// only needs the derived path to clean them up on removal.
#[must_use]
pub fn thumbnail_path(pattern: &str, bg_dir: &Path, file_name: &str) -> PathBuf {
    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) => (stem, ext),
        None => (file_name, ""),
    };
    PathBuf::from(
        pattern
            .replace("${BG_DIR}", &bg_dir.to_string_lossy())
            .replace("${STEM}", stem)
            .replace("${EXT}", ext),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_parses() {
        let catalog = Catalog::load_default().expect("embedded catalog must parse");
        assert!(catalog.apps().count() > 0);
        assert!(catalog.backgrounds().count() > 0);
    }

    #[test]
    fn test_malformed_documents_are_fatal() {
        assert!(matches!(
            Catalog::from_json("{not json", "{}"),
            Err(BackgroundsError::Catalog(_))
        ));
        assert!(matches!(
            Catalog::from_json("{}", "[1, 2]"),
            Err(BackgroundsError::Catalog(_))
        ));
    }

    #[test]
    fn test_unknown_keys_are_lazy_errors() {
        let catalog = Catalog::from_json("{}", "{}").unwrap();
        assert!(catalog.app("teams").is_err());
        assert!(catalog.background("nature").is_err());
    }

    #[test]
    fn test_background_file_name() {
        assert_eq!(
            background_file_name("nature", "https://example.com/images/forest.jpg"),
            "nature_forest.jpg"
        );
        // No slash at all: the whole URL is the basename.
        assert_eq!(background_file_name("x", "forest.jpg"), "x_forest.jpg");
    }

    #[test]
    fn test_thumbnail_path_expansion() {
        let thumb = thumbnail_path(
            "${BG_DIR}/${STEM}_thumb.${EXT}",
            Path::new("/tmp/uploads"),
            "nature_forest.jpg",
        );
        assert_eq!(thumb, PathBuf::from("/tmp/uploads/nature_forest_thumb.jpg"));
    }

    #[test]
    fn test_thumbnail_path_without_extension() {
        let thumb = thumbnail_path(
            "${BG_DIR}/${STEM}_thumb.${EXT}",
            Path::new("/tmp/uploads"),
            "nature_forest",
        );
        assert_eq!(thumb, PathBuf::from("/tmp/uploads/nature_forest_thumb."));
    }

    #[test]
    fn test_registry_shape() {
        let apps = r#"{
            "appa": {
                "bg_dir": {"Linux": "/tmp/appa-bg"},
                "bg_path_pattern": "${BG_DIR}/${STEM}_t.${EXT}"
            }
        }"#;
        let backgrounds = r#"{
            "nature": {
                "title": "Nature",
                "url": "https://example.com",
                "image_urls": ["https://example.com/a.jpg", "https://example.com/b.jpg"]
            }
        }"#;
        let catalog = Catalog::from_json(apps, backgrounds).unwrap();
        let app = catalog.app("appa").unwrap();
        assert_eq!(app.bg_dir.get("Linux").unwrap(), "/tmp/appa-bg");
        assert!(app.metadata_db.is_none());
        let bg = catalog.background("nature").unwrap();
        assert_eq!(bg.image_urls.len(), 2);
    }
}
