//! `custody file upload|encrypt|decrypt|register|cid|c2pa`.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::{cli::FileAction, context::AppContext};

pub async fn run(ctx: &AppContext, action: FileAction) -> Result<()> {
    match action {
        FileAction::Upload { path, project_path } => upload(ctx, &path, project_path.as_deref()).await,
        FileAction::Encrypt { cid } => encrypt(ctx, &cid).await,
        FileAction::Decrypt { cid, out } => decrypt(ctx, &cid, &out),
        FileAction::Register { cid } => register(ctx, &cid).await,
        FileAction::Cid { path } => cid(&path),
        FileAction::C2pa { cid, manifest } => c2pa(ctx, &cid, &manifest).await,
    }
}

/// Ingests a single local file outside the watcher's recursive scan.
/// `--project-path` is accepted for parity with the CLI surface but, absent
/// a loaded project index here, ingestion proceeds without project
/// attribution — the watcher (`custody sync`) is the path that attaches it.
async fn upload(ctx: &AppContext, path: &PathBuf, project_path: Option<&str>) -> Result<()> {
    if project_path.is_some() {
        log::warn!("--project-path is only honored by the directory watcher; ingesting without project attribution");
    }

    let outcome = custody_ingest::ingest_path(&ctx.ingest, path, None).await?;
    println!("{}", outcome.cid);
    Ok(())
}

async fn encrypt(ctx: &AppContext, source_cid: &str) -> Result<()> {
    let derive_ctx = ctx.derive_context()?;
    let cid = custody_derive::encrypt_cid(&derive_ctx, source_cid).await?;
    println!("{cid}");
    Ok(())
}

/// Looks the key up from the configured key store under `(cid, "content")`
/// rather than requiring a manual key file path.
fn decrypt(ctx: &AppContext, cid: &str, out: &PathBuf) -> Result<()> {
    let source_path = ctx.config.dirs.files.join(cid);
    if !source_path.exists() {
        bail!("no file stored under CID {cid}");
    }

    let key_bytes = ctx
        .keystore()
        .get(cid, "content")?
        .with_context(|| format!("no encryption key found for CID {cid}"))?;
    if key_bytes.len() != 32 {
        bail!("expected key to be 32 bytes, found {}", key_bytes.len());
    }
    let key: dryoc::secretstream::Key = key_bytes
        .as_slice()
        .try_into()
        .map_err(|_| anyhow::anyhow!("malformed key bytes for CID {cid}"))?;

    let input = std::fs::File::open(&source_path)?;
    let mut output = std::fs::File::create(out)?;
    match custody_crypt::decrypt_stream(input, &mut output, &key) {
        Ok(()) => {
            println!("decrypted into {}", out.display());
            Ok(())
        }
        Err(e) => {
            let _ = std::fs::remove_file(out);
            Err(e)
        }
    }
}

/// Chain/anchor registration is explicitly out of scope for this core:
/// it's an external collaborator reached only through a configured binary
/// this crate doesn't ship.
async fn register(_ctx: &AppContext, cid: &str) -> Result<()> {
    bail!("chain registration for {cid} requires an external registrar not configured in this build")
}

fn cid(path: &PathBuf) -> Result<()> {
    let hashes = custody_cid::compute_file_cid(path)?;
    println!("cid: {}", hashes.cid);
    println!("sha256: {}", hashes.sha256);
    println!("md5: {}", hashes.md5);
    println!("blake3: {}", hashes.blake3);
    println!("file_size: {}", hashes.file_size);
    Ok(())
}

async fn c2pa(ctx: &AppContext, source_cid: &str, manifest: &str) -> Result<()> {
    let derive_ctx = ctx.derive_context()?;
    let cid = custody_derive::inject_provenance(&derive_ctx, source_cid, manifest).await?;
    println!("{cid}");
    Ok(())
}
