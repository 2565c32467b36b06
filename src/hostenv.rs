//! Host environment bridge
//!
//! Everything the resolver and manager need to know about the machine they
//! run on — current OS, environment variables, WSL detection, the `cmd.exe`
//! and `wslpath` shell-outs used under a compatibility layer, and folder
//! opening — sits behind the narrow [`HostEnv`] trait. The real
//! implementation shells out to host utilities; [`MockHostEnv`] lets unit
//! tests exercise the compatibility path without an actual WSL install.

use crate::error::{BackgroundsError, Result};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// The fixed set of operating systems path candidates can target
///
/// Keys match what Python's `platform.system()` reports, which is the
/// convention the catalog documents inherited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsName {
    Windows,
    Darwin,
    Linux,
}

impl OsName {
    /// OS the current process was compiled for
    #[must_use]
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::Darwin
        } else {
            Self::Linux
        }
    }

    /// Catalog lookup key for this OS
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Windows => "Windows",
            Self::Darwin => "Darwin",
            Self::Linux => "Linux",
        }
    }
}

impl fmt::Display for OsName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Narrow bridge to the host operating system
pub trait HostEnv {
    /// Operating system the process is running on
    fn current_os(&self) -> OsName;

    /// Look up a process environment variable
    fn env_var(&self, name: &str) -> Option<String>;

    /// Whether the process runs on Linux under a Windows-interop layer (WSL)
    fn is_compat_layer(&self) -> bool;

    /// Query a Windows-side environment variable through the interop layer
    ///
    /// # Errors
    /// - The `cmd.exe` invocation fails or produces no output
    fn windows_env_var(&self, name: &str) -> Result<String>;

    /// Translate a Windows path into the native filesystem's syntax
    ///
    /// # Errors
    /// - The `wslpath` invocation fails
    fn to_native_path(&self, windows_path: &str) -> Result<PathBuf>;

    /// Translate a native path into Windows syntax
    ///
    /// # Errors
    /// - The `wslpath -w` invocation fails
    fn to_windows_path(&self, native_path: &Path) -> Result<String>;

    /// Open a folder in the platform's file browser (launch-and-forget)
    ///
    /// # Errors
    /// - The opener process could not be spawned
    fn open_folder(&self, path: &Path) -> Result<()>;
}

/// Real host bridge shelling out to host utilities
#[derive(Debug, Default)]
pub struct SystemHostEnv;

impl SystemHostEnv {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn run_for_stdout(command: &mut Command, what: &str) -> Result<String> {
        let output = command
            .output()
            .map_err(|e| BackgroundsError::process_error(what, &e))?;
        if !output.status.success() {
            return Err(BackgroundsError::process_error(
                what,
                &std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("exited with {}", output.status),
                ),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl HostEnv for SystemHostEnv {
    fn current_os(&self) -> OsName {
        OsName::current()
    }

    fn env_var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn is_compat_layer(&self) -> bool {
        self.current_os() == OsName::Linux && std::env::var_os("WSL_DISTRO_NAME").is_some()
    }

    fn windows_env_var(&self, name: &str) -> Result<String> {
        // cmd.exe refuses to start from a Linux-side working directory,
        // so the query runs from the mounted system drive.
        let value = Self::run_for_stdout(
            Command::new("cmd.exe")
                .args(["/C", &format!("echo %{}%", name)])
                .current_dir("/mnt/c"),
            "cmd.exe",
        )?;
        if value.is_empty() || value == format!("%{}%", name) {
            return Err(BackgroundsError::process_error(
                "cmd.exe",
                &std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("Windows environment variable %{}% is not set", name),
                ),
            ));
        }
        Ok(value)
    }

    fn to_native_path(&self, windows_path: &str) -> Result<PathBuf> {
        Self::run_for_stdout(Command::new("wslpath").arg(windows_path), "wslpath")
            .map(PathBuf::from)
    }

    fn to_windows_path(&self, native_path: &Path) -> Result<String> {
        Self::run_for_stdout(
            Command::new("wslpath").arg("-w").arg(native_path),
            "wslpath -w",
        )
    }

    fn open_folder(&self, path: &Path) -> Result<()> {
        let program = match self.current_os() {
            OsName::Windows => "explorer",
            OsName::Darwin => "open",
            OsName::Linux => "xdg-open",
        };
        Command::new(program)
            .arg(path)
            .spawn()
            .map_err(|e| BackgroundsError::process_error(program, &e))?;
        Ok(())
    }
}

/// Scripted host bridge for tests and debugging
///
/// Windows → native translation maps a drive-letter path onto `wsl_root`
/// (for example `C:\Users\me` onto `<wsl_root>/Users/me`), which lets tests
/// point the "Windows filesystem" at a temp directory.
#[derive(Debug)]
pub struct MockHostEnv {
    pub os: OsName,
    pub compat_layer: bool,
    pub vars: BTreeMap<String, String>,
    pub windows_vars: BTreeMap<String, String>,
    pub wsl_root: PathBuf,
    opened: RefCell<Vec<PathBuf>>,
}

impl MockHostEnv {
    #[must_use]
    pub fn new(os: OsName) -> Self {
        Self {
            os,
            compat_layer: false,
            vars: BTreeMap::new(),
            windows_vars: BTreeMap::new(),
            wsl_root: PathBuf::from("/mnt/c"),
            opened: RefCell::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_compat_layer(mut self, wsl_root: impl Into<PathBuf>) -> Self {
        self.compat_layer = true;
        self.wsl_root = wsl_root.into();
        self
    }

    #[must_use]
    pub fn with_var(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn with_windows_var(mut self, name: &str, value: &str) -> Self {
        self.windows_vars.insert(name.to_string(), value.to_string());
        self
    }

    /// Folders handed to `open_folder` so far
    #[must_use]
    pub fn opened_folders(&self) -> Vec<PathBuf> {
        self.opened.borrow().clone()
    }

    fn strip_drive(windows_path: &str) -> &str {
        let rest = windows_path
            .get(1..)
            .and_then(|s| s.strip_prefix(':'))
            .unwrap_or(windows_path);
        rest.trim_start_matches('\\')
    }
}

impl HostEnv for MockHostEnv {
    fn current_os(&self) -> OsName {
        self.os
    }

    fn env_var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }

    fn is_compat_layer(&self) -> bool {
        self.compat_layer
    }

    fn windows_env_var(&self, name: &str) -> Result<String> {
        self.windows_vars.get(name).cloned().ok_or_else(|| {
            BackgroundsError::process_error(
                "cmd.exe",
                &std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("Windows environment variable %{}% is not set", name),
                ),
            )
        })
    }

    fn to_native_path(&self, windows_path: &str) -> Result<PathBuf> {
        let relative = Self::strip_drive(windows_path).replace('\\', "/");
        Ok(self.wsl_root.join(relative))
    }

    fn to_windows_path(&self, native_path: &Path) -> Result<String> {
        let relative = native_path
            .strip_prefix(&self.wsl_root)
            .unwrap_or(native_path);
        Ok(format!(
            "C:\\{}",
            relative.to_string_lossy().replace('/', "\\")
        ))
    }

    fn open_folder(&self, path: &Path) -> Result<()> {
        self.opened.borrow_mut().push(path.to_path_buf());
        Ok(())
    }
}
