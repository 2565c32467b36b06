//! Platform path resolution for per-application install locations
//!
//! Each application's catalog entry carries per-OS path templates. The
//! resolver picks the candidate for the running OS, expands environment
//! references, and validates existence. When no native candidate works and
//! the process runs under a Windows-interop layer, the `"Windows"`
//! candidate is retried through the layer's environment-query and
//! path-translation facilities.
//!
//! Successful resolutions are cached per (application id, kind) for the
//! process lifetime: resolution is pure given the environment and
//! filesystem state at first call, and callers must not expect
//! re-resolution mid-run.

use crate::catalog::Application;
use crate::error::{BackgroundsError, Result};
use crate::hostenv::{HostEnv, OsName};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// What a path candidate set points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathKind {
    /// The directory holding installed background images. The leaf may be
    /// created later by the caller; only its parent must exist.
    BackgroundDir,
    /// An application's metadata index file. The external application owns
    /// and creates it, so the file itself must exist.
    MetadataStore,
}

impl PathKind {
    fn must_exist_as_file(self) -> bool {
        matches!(self, Self::MetadataStore)
    }

    fn describe(self) -> &'static str {
        match self {
            Self::BackgroundDir => "background directory",
            Self::MetadataStore => "metadata store",
        }
    }
}

/// Path resolver with a per-process memoization cache
pub struct PathResolver<'a> {
    env: &'a dyn HostEnv,
    cache: HashMap<(String, PathKind), PathBuf>,
}

impl<'a> PathResolver<'a> {
    #[must_use]
    pub fn new(env: &'a dyn HostEnv) -> Self {
        Self {
            env,
            cache: HashMap::new(),
        }
    }

    /// Resolve the background directory for an application
    ///
    /// # Errors
    /// - [`BackgroundsError::UnsupportedPlatform`] when no candidate exists
    /// - [`BackgroundsError::PathNotFound`] when candidates fail validation
    pub fn background_dir(&mut self, app_id: &str, app: &Application) -> Result<PathBuf> {
        self.resolve(app_id, PathKind::BackgroundDir, &app.bg_dir)
    }

    /// Resolve the metadata store path, if the application has one
    ///
    /// # Errors
    /// Same as [`Self::background_dir`]; `Ok(None)` when the application
    /// does not keep a metadata index.
    pub fn metadata_store(&mut self, app_id: &str, app: &Application) -> Result<Option<PathBuf>> {
        match &app.metadata_db {
            None => Ok(None),
            Some(candidates) => self
                .resolve(app_id, PathKind::MetadataStore, candidates)
                .map(Some),
        }
    }

    /// Resolve one candidate set, consulting the cache first
    pub fn resolve(
        &mut self,
        app_id: &str,
        kind: PathKind,
        candidates: &BTreeMap<String, String>,
    ) -> Result<PathBuf> {
        let key = (app_id.to_string(), kind);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit.clone());
        }
        let resolved = self.resolve_uncached(app_id, kind, candidates)?;
        log::debug!(
            "resolved {} for \"{}\": {}",
            kind.describe(),
            app_id,
            resolved.display()
        );
        self.cache.insert(key, resolved.clone());
        Ok(resolved)
    }

    fn resolve_uncached(
        &self,
        app_id: &str,
        kind: PathKind,
        candidates: &BTreeMap<String, String>,
    ) -> Result<PathBuf> {
        let os = self.env.current_os();
        let must_exist_as_file = kind.must_exist_as_file();
        let mut attempted: Vec<PathBuf> = Vec::new();
        let mut saw_candidate = false;

        if let Some(template) = candidates.get(os.key()) {
            saw_candidate = true;
            let path = PathBuf::from(expand_env_refs(template, |name| self.env.env_var(name)));
            if candidate_is_usable(&path, must_exist_as_file) {
                return Ok(path);
            }
            attempted.push(path);
        }

        if os != OsName::Windows && self.env.is_compat_layer() {
            if let Some(template) = candidates.get(OsName::Windows.key()) {
                saw_candidate = true;
                log::info!(
                    "no native {} for \"{}\"; interop layer detected, trying the Windows candidate",
                    kind.describe(),
                    app_id
                );
                match self.translate_windows_candidate(template) {
                    Ok(path) => {
                        if candidate_is_usable(&path, must_exist_as_file) {
                            return Ok(path);
                        }
                        attempted.push(path);
                    }
                    Err(e) => {
                        log::warn!("interop-layer translation failed: {}", e);
                    }
                }
            }
        }

        if saw_candidate {
            Err(BackgroundsError::path_not_found(
                app_id,
                kind.describe(),
                attempted,
            ))
        } else {
            Err(BackgroundsError::unsupported_platform(app_id, os))
        }
    }

    /// Expand `%VAR%` references with Windows-side values, then translate
    /// the whole path into native syntax
    fn translate_windows_candidate(&self, template: &str) -> Result<PathBuf> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(pos) = rest.find('%') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos + 1..];
            match tail.find('%') {
                Some(end) if end > 0 && tail[..end].chars().all(is_var_char) => {
                    out.push_str(&self.env.windows_env_var(&tail[..end])?);
                    rest = &tail[end + 1..];
                }
                _ => {
                    out.push('%');
                    rest = tail;
                }
            }
        }
        out.push_str(rest);
        self.env.to_native_path(&out)
    }
}

/// Existence validation: the file itself, or only its parent directory
fn candidate_is_usable(path: &Path, must_exist_as_file: bool) -> bool {
    if must_exist_as_file {
        path.is_file()
    } else {
        path.parent().is_some_and(Path::is_dir)
    }
}

/// Expand `%VAR%`, `$VAR` and `${VAR}` references against a lookup
///
/// References to unset variables stay verbatim so the eventual validation
/// failure reports the literal, unexpanded candidate.
pub(crate) fn expand_env_refs(
    template: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find(&['%', '$'][..]) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix('%') {
            match after.find('%') {
                Some(end) if end > 0 && after[..end].chars().all(is_var_char) => {
                    match lookup(&after[..end]) {
                        Some(value) => out.push_str(&value),
                        None => out.push_str(&tail[..end + 2]),
                    }
                    rest = &after[end + 1..];
                }
                _ => {
                    out.push('%');
                    rest = after;
                }
            }
        } else if let Some(after) = tail.strip_prefix("${") {
            match after.find('}') {
                Some(end) if end > 0 && after[..end].chars().all(is_var_char) => {
                    match lookup(&after[..end]) {
                        Some(value) => out.push_str(&value),
                        None => out.push_str(&tail[..end + 3]),
                    }
                    rest = &after[end + 1..];
                }
                _ => {
                    out.push('$');
                    rest = &tail[1..];
                }
            }
        } else {
            let after = &tail[1..];
            let end = after
                .find(|c: char| !is_var_char(c))
                .unwrap_or(after.len());
            if end == 0 {
                out.push('$');
                rest = after;
            } else {
                match lookup(&after[..end]) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(&tail[..end + 1]),
                }
                rest = &after[end..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn is_var_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
