//! Flag parsing and subcommand dispatch.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "custody", about = "Content-integrity ingestion, verification, and custody pipeline")]
pub struct Cli {
    /// Path to the TOML config file. Defaults to `$CUSTODY_CONFIG_PATH` or
    /// `/etc/custody/config.toml`.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Get or set an attribute on a CID.
    Attr {
        #[command(subcommand)]
        action: AttrAction,
    },
    /// File-level operations: upload, encrypt, decrypt, register, cid, c2pa.
    File {
        #[command(subcommand)]
        action: FileAction,
    },
    /// One-shot recursive scan of a project root, without watching it afterward.
    PreprocessorFolder {
        /// Root directory to scan.
        path: PathBuf,
    },
    /// Alias for `preprocessor-folder` followed by watching the root forever.
    Sync {
        /// Root directory to scan and then watch.
        path: PathBuf,
    },
    /// Runs the webhook server.
    Webhook,
    /// Generates or displays a new per-(CID, attribute) encryption key.
    Genkey {
        cid: String,
        attr: String,
    },
}

#[derive(Subcommand)]
pub enum AttrAction {
    Get {
        #[arg(long)]
        cid: String,
        #[arg(long)]
        attr: Option<String>,
        #[arg(long)]
        all: bool,
        #[arg(long)]
        encrypted: bool,
    },
    Set {
        #[arg(long)]
        cid: String,
        #[arg(long)]
        attr: String,
        #[arg(long)]
        str_value: Option<String>,
        #[arg(long)]
        json_value: Option<String>,
        #[arg(long)]
        encrypted: bool,
        #[arg(long)]
        index: bool,
    },
}

#[derive(Subcommand)]
pub enum FileAction {
    /// Ingests a single file from the local filesystem, outside the watcher.
    Upload {
        path: PathBuf,
        /// Dotted project path this file belongs to, e.g. `org/team`.
        #[arg(long)]
        project_path: Option<String>,
    },
    /// Produces an encrypted copy of an already-custodied asset.
    Encrypt {
        cid: String,
    },
    /// Decrypts a previously-encrypted derived asset back to stdout-adjacent output.
    Decrypt {
        cid: String,
        #[arg(long)]
        out: PathBuf,
    },
    /// Registers a CID with an external chain/anchor service.
    Register {
        cid: String,
    },
    /// Computes and prints the CID of a local file without ingesting it.
    Cid {
        path: PathBuf,
    },
    /// Runs the provenance-injection flow against a named manifest template.
    C2pa {
        cid: String,
        #[arg(long)]
        manifest: String,
    },
}
