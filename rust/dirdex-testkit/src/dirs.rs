//! Directory and path utilities for test resources.

use std::path::PathBuf;

/// The manifest directory of `dirdex-testkit`, set at compile time by the
/// build script.
pub const TESTKIT_SRC_DIR_STR: &str = env!("TESTKIT_SRC_DIR");

pub fn get_testkit_src_dir() -> anyhow::Result<PathBuf> {
    let res = PathBuf::from(TESTKIT_SRC_DIR_STR);
    if !res.is_dir() {
        anyhow::bail!("{} not found", res.display());
    }
    Ok(res)
}

/// Returns the path to the sample directory entries
/// (`dirdex-testkit/samples/entries.json`).
pub fn get_sample_entries_path() -> anyhow::Result<PathBuf> {
    let path = get_testkit_src_dir()?.join("samples").join("entries.json");
    if !path.is_file() {
        anyhow::bail!("{} not found", path.display());
    }
    Ok(path)
}

/// Creates an empty scratch directory, removed when the returned handle is
/// dropped.
pub fn scratch_dir(prefix: &str) -> anyhow::Result<tempfile::TempDir> {
    Ok(tempfile::Builder::new().prefix(prefix).tempdir()?)
}
