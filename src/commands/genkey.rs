//! `custody genkey`: generates and stores an encryption key for a
//! (CID, attribute) pair. Signing-key generation is out of scope — that's
//! a plain `openssl genpkey` invocation, nothing this crate owns.

use anyhow::Result;
use dryoc::types::Bytes;

use crate::context::AppContext;

pub fn run(ctx: &AppContext, cid: &str, attr: &str) -> Result<()> {
    if let Some(existing) = ctx.keystore().get(cid, attr)? {
        println!(
            "key already exists for ({cid}, {attr}): {}",
            ctx.config.dirs.keys.join(format!("{cid}_{attr}.key")).display()
        );
        let _ = existing;
        return Ok(());
    }

    let key = custody_crypt::generate_key();
    let path = ctx.keystore().put(cid, attr, key.as_slice())?;
    println!("generated key stored at {}", path.display());
    Ok(())
}
