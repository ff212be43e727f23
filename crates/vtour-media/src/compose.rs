//! Concat-demuxer manifest handling.

use std::path::Path;
use tokio::fs;

use crate::error::MediaResult;

/// Body of an ffmpeg concat manifest: one `file '<path>'` line per chunk.
pub fn concat_manifest_body(chunks: &[String]) -> String {
    let mut body = String::new();
    for chunk in chunks {
        body.push_str(&format!("file '{chunk}'\n"));
    }
    body
}

/// Write the concat manifest for the given chunk outputs.
pub async fn write_concat_manifest(path: &Path, chunks: &[String]) -> MediaResult<()> {
    fs::write(path, concat_manifest_body(chunks)).await?;
    Ok(())
}
