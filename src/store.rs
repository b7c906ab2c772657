//! A spreadsheet backed by a JSON file holding its dump.
//!
//! The file is a list of `[cell, formula]` pairs in dump order, so replaying
//! it front to back through [`SpreadSheet::edit`] rebuilds the sheet.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::{Error, Result};
use crate::sheet::{CellInfo, SpreadSheet, Updates};

pub struct Store {
    path: PathBuf,
    sheet: SpreadSheet,
}

impl Store {
    /// Opens the sheet saved at `path`. A missing file is an empty sheet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut sheet = SpreadSheet::new();
        match read_dump(&path) {
            Ok(entries) => {
                info!("replaying {} cells from {}", entries.len(), path.display());
                replay(&mut sheet, &entries)?;
            }
            Err(Error::Io(err)) if err.kind() == ErrorKind::NotFound => {
                info!("{} does not exist, starting empty", path.display());
            }
            Err(err) => return Err(err),
        }
        Ok(Self { path, sheet })
    }

    pub fn edit(&mut self, cell: &str, formula: &str) -> Result<Updates> {
        let updates = self.sheet.edit(cell, formula)?;
        self.save()?;
        Ok(updates)
    }

    pub fn query(&self, cell: &str) -> CellInfo {
        self.sheet.query(cell)
    }

    pub fn delete(&mut self, cell: &str) -> Result<Updates> {
        let updates = self.sheet.delete(cell)?;
        self.save()?;
        Ok(updates)
    }

    pub fn copy(&mut self, dest: &str, src: &str) -> Result<Updates> {
        let updates = self.sheet.copy(dest, src)?;
        self.save()?;
        Ok(updates)
    }

    pub fn dump(&self) -> Vec<(String, String)> {
        self.sheet.dump()
    }

    /// Empties the file, then the sheet. Clearing cannot be undone, so the
    /// sheet is only touched once the write has succeeded.
    pub fn clear(&mut self) -> Result<()> {
        write_dump(&self.path, &[])?;
        self.sheet.clear();
        info!("cleared {}", self.path.display());
        Ok(())
    }

    /// Replays a dump file into this sheet, merging every result. If any
    /// pair fails or the file cannot be written, the sheet is rebuilt as it
    /// was before the load.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<Updates> {
        let entries = read_dump(path.as_ref())?;
        info!("loading {} cells from {}", entries.len(), path.as_ref().display());
        let before = self.sheet.dump();
        let result = replay(&mut self.sheet, &entries).and_then(|updates| {
            write_dump(&self.path, &self.sheet.dump())?;
            Ok(updates)
        });
        if result.is_err() {
            warn!("load failed, restoring {} cells", before.len());
            let mut sheet = SpreadSheet::new();
            replay(&mut sheet, &before)?;
            self.sheet = sheet;
        }
        result
    }

    // Rewrites the file; if that fails the last operation is undone.
    fn save(&mut self) -> Result<()> {
        if let Err(err) = write_dump(&self.path, &self.sheet.dump()) {
            self.sheet.undo();
            return Err(err);
        }
        info!("saved {} cells to {}", self.sheet.len(), self.path.display());
        Ok(())
    }
}

fn read_dump(path: &Path) -> Result<Vec<(String, String)>> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn write_dump(path: &Path, entries: &[(String, String)]) -> Result<()> {
    let text = serde_json::to_string_pretty(entries)?;
    fs::write(path, text)?;
    Ok(())
}

fn replay(sheet: &mut SpreadSheet, entries: &[(String, String)]) -> Result<Updates> {
    let mut updates = Updates::new();
    for (cell, formula) in entries {
        updates.extend(sheet.edit(cell, formula)?);
    }
    Ok(updates)
}
