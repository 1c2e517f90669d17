//! Input/output helpers.
//!
//! - checkpoint store (`checkpoint`)
//! - ledger text table (`ledger`)
//! - model description JSON read/write (`model_file`)

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::AppError;

pub mod checkpoint;
pub mod ledger;
pub mod model_file;

pub use checkpoint::*;
pub use ledger::*;
pub use model_file::*;

/// Write `path` through a sibling `<path>.tmp` that is renamed into place.
pub(crate) fn write_atomically<F>(path: &Path, write: F) -> std::io::Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let tmp = tmp_path(path);
    let mut writer = BufWriter::new(File::create(&tmp)?);
    let written = write(&mut writer).and_then(|()| writer.flush());
    drop(writer);
    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    std::fs::rename(&tmp, path)
}

pub(crate) fn remove_if_exists(path: &Path) -> Result<(), AppError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::new(2, format!("Failed to remove '{}': {e}", path.display()))),
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
