//! Metadata index synchronization for store-backed applications
//!
//! Zoom keeps a row per custom virtual background in a SQLite database next
//! to the image files. Installing or removing a background through this
//! tool must mirror that index, or the application shows stale entries.
//!
//! The store belongs to the external application: it is opened read-write
//! but never created, each sync runs inside a single exclusive transaction,
//! and the connection is closed before returning so the application is
//! never blocked by a lingering lock.

use crate::error::{BackgroundsError, Result};
use rusqlite::{params, Connection, OpenFlags, TransactionBehavior};
use std::path::Path;

/// Table holding one row per installed custom background
pub const BACKGROUND_TABLE: &str = "zoom_conf_video_background_a";

// Fixed column defaults for rows this tool inserts.
const ROW_TYPE: i64 = 1;
const ROW_ORDER: i64 = 100;

/// Mirror direction for one background file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Add,
    Remove,
}

/// Insert or delete the index row for one background file
///
/// `background_path` must already be normalized to the representation the
/// store expects (Windows syntax when the owning application runs on the
/// Windows side of an interop layer). Matching on `Remove` is exact string
/// equality. Repeated `Add` calls insert duplicate rows; removing a path
/// with no matching row is a no-op.
///
/// # Errors
/// - [`BackgroundsError::MetadataSync`] on any store open or write failure
pub fn sync_background_row(
    store_path: &Path,
    background_path: &str,
    action: SyncAction,
) -> Result<()> {
    let mut conn = open_store(store_path)?;
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Exclusive)
        .map_err(|e| BackgroundsError::metadata_sync(store_path, e))?;

    match action {
        SyncAction::Add => {
            tx.execute(
                "INSERT INTO zoom_conf_video_background_a \
                 (path, name, type, \"index\", thumb_path) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    background_path,
                    display_name(background_path),
                    ROW_TYPE,
                    ROW_ORDER,
                    ""
                ],
            )
            .map_err(|e| BackgroundsError::metadata_sync(store_path, e))?;
        }
        SyncAction::Remove => {
            let affected = tx
                .execute(
                    "DELETE FROM zoom_conf_video_background_a WHERE path = ?1",
                    params![background_path],
                )
                .map_err(|e| BackgroundsError::metadata_sync(store_path, e))?;
            if affected == 0 {
                log::debug!("no index row matched {}", background_path);
            }
        }
    }

    tx.commit()
        .map_err(|e| BackgroundsError::metadata_sync(store_path, e))
}

/// Open the store read-write, never creating it
fn open_store(store_path: &Path) -> Result<Connection> {
    Connection::open_with_flags(store_path, OpenFlags::SQLITE_OPEN_READ_WRITE)
        .map_err(|e| BackgroundsError::metadata_sync(store_path, e))
}

/// Display name for a row: the file's basename without its extension
fn display_name(path: &str) -> &str {
    let base = path.rsplit(&['/', '\\'][..]).next().unwrap_or(path);
    base.rsplit_once('.').map_or(base, |(stem, _)| stem)
}
