//! Single-step file replacement for refs, index, and config writes.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{EnkelError, EnkelResult};

/// Replace `target`'s content in one visible step.
///
/// New bytes are staged in a dot-prefixed sibling of `target`, flushed,
/// then renamed over it. The sibling lives in the target's own directory,
/// so the rename never crosses a filesystem boundary: readers observe the
/// old content or the new, never a partial write. A failed rename leaves
/// `target` untouched and discards the staging file. Durability beyond
/// the data flush is not a goal.
pub fn replace_file(target: &Path, data: &[u8]) -> EnkelResult<()> {
    let staged = staging_path(target)?;
    {
        let mut file = fs::File::create(&staged)?;
        file.write_all(data)?;
        file.sync_data()?;
    }
    if let Err(err) = fs::rename(&staged, target) {
        let _ = fs::remove_file(&staged);
        return Err(EnkelError::Io(err));
    }
    Ok(())
}

/// The staging sibling for `target`: `.<name>.stage` in the same directory.
fn staging_path(target: &Path) -> EnkelResult<PathBuf> {
    let dir = target.parent().ok_or_else(|| {
        EnkelError::Other(format!("no parent directory for {}", target.display()))
    })?;
    let name = target.file_name().ok_or_else(|| {
        EnkelError::Other(format!("no file name in {}", target.display()))
    })?;
    Ok(dir.join(format!(".{}.stage", name.to_string_lossy())))
}
