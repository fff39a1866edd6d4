pub use clap::Parser;

use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "blobdrop")]
#[command(about = "Share blobs through a bootstrap server", version)]
pub struct Args {
    /// Bootstrap server URL (defaults to the configured remote, then localhost)
    #[arg(long, global = true)]
    pub remote: Option<Url>,

    /// Path to the blobdrop config directory (defaults to ~/.blobdrop)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
