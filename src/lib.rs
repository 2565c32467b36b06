#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_errors_doc)]

//! # Meeting Backgrounds
//!
//! Download, install and remove virtual background images for desktop
//! meeting applications (Microsoft Teams, Skype, Zoom).
//!
//! Curated background collections and per-application install locations
//! live in a static catalog. Installing a collection writes each image into
//! the platform-specific directory the meeting application watches;
//! removing it deletes those copies (and any thumbnails the application
//! derived). Applications that track their custom backgrounds in a side
//! index — Zoom's `zoomus.db` — get that index kept in sync with every
//! install and removal.
//!
//! Path resolution understands per-OS candidates with environment
//! references and falls back to the Windows install location when running
//! on Linux under WSL, translating paths through the interop layer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use meeting_backgrounds::{BackgroundManager, Catalog, SystemHostEnv};
//!
//! # fn example() -> meeting_backgrounds::Result<()> {
//! let catalog = Catalog::load_default()?;
//! let env = SystemHostEnv::new();
//! let mut manager = BackgroundManager::new(&catalog, &env)?;
//!
//! let downloaded = manager.download(
//!     &["teams".to_string()],
//!     &["nature".to_string()],
//!     false,
//! )?;
//! println!("{} backgrounds downloaded.", downloaded);
//! # Ok(())
//! # }
//! ```
//!
//! ## Library vs CLI Usage
//!
//! All core functionality is available by default; the `cli` feature
//! (enabled by default) adds the command-line interface and the tracing
//! subscriber setup. To use only as a library:
//!
//! ```toml
//! [dependencies]
//! meeting-backgrounds = { version = "0.2", default-features = false }
//! ```

pub mod catalog;
#[cfg(feature = "cli")]
pub mod cli;
pub mod error;
pub mod hostenv;
pub mod manager;
pub mod metadata;
pub mod resolver;
#[cfg(feature = "cli")]
pub mod tracing_config;

// Public API exports
pub use catalog::{background_file_name, thumbnail_path, Application, BackgroundCollection, Catalog};
pub use error::{BackgroundsError, Result};
pub use hostenv::{HostEnv, MockHostEnv, OsName, SystemHostEnv};
pub use manager::{BackgroundManager, CollectionStatus};
pub use metadata::{sync_background_row, SyncAction};
pub use resolver::{PathKind, PathResolver};

#[cfg(feature = "cli")]
pub use tracing_config::{TracingConfig, TracingFormat};
