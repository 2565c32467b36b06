//! Meeting Backgrounds CLI Tool
//!
//! Command-line interface for downloading, installing and removing virtual
//! background images for desktop meeting applications.

#[cfg(feature = "cli")]
use meeting_backgrounds::cli;

#[cfg(feature = "cli")]
fn main() -> anyhow::Result<()> {
    cli::main()
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
