use std::path::PathBuf;

use custody_attest_client::AttestClient;
use custody_keystore::KeyStore;

/// Handles shared by both derived-artifact flows.
pub struct DeriveContext {
    pub attest: AttestClient,
    pub keystore: KeyStore,
    pub files_dir: PathBuf,
    pub temp_dir: PathBuf,
    /// Directory holding named `{name}.json` provenance manifest templates.
    pub template_dir: PathBuf,
    /// Path to the external provenance-injection tool binary.
    pub c2pa_tool_path: PathBuf,
}

impl DeriveContext {
    pub fn source_path(&self, cid: &str) -> PathBuf {
        self.files_dir.join(cid)
    }
}

/// Moves `tmp` into `{files_dir}/{cid}`, falling back to copy+unlink across
/// devices, matching the same discipline the ingest pipeline uses.
pub(crate) fn move_into_files_dir(
    tmp: tempfile::NamedTempFile,
    files_dir: &std::path::Path,
    cid: &str,
) -> std::io::Result<()> {
    std::fs::create_dir_all(files_dir)?;
    let dest = files_dir.join(cid);
    if dest.exists() {
        return Ok(());
    }
    match tmp.persist(&dest) {
        Ok(_) => Ok(()),
        Err(persist_err) => {
            let tmp_path = persist_err.file.path().to_path_buf();
            std::fs::copy(&tmp_path, &dest)?;
            std::fs::remove_file(&tmp_path)?;
            Ok(())
        }
    }
}
