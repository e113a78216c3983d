//! Durable-form persistence for Parlance
//!
//! A small trait for entities that can be written to and reconstructed from
//! a file, with the on-disk format chosen by file extension through an
//! explicit enum-keyed strategy rather than runtime type inspection.

use crate::error::{ParlanceError, Result};
use std::path::Path;

/// On-disk format for a durable form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Structured JSON document
    Json,
    /// Raw UTF-8 text
    Text,
}

impl FileFormat {
    /// Determine the format from a path's extension
    ///
    /// Unknown extensions are a hard error: they indicate operator misuse,
    /// not a runtime condition.
    ///
    /// # Examples
    ///
    /// ```
    /// use parlance::persist::FileFormat;
    /// use std::path::Path;
    ///
    /// assert_eq!(
    ///     FileFormat::from_path(Path::new("cache.json")).unwrap(),
    ///     FileFormat::Json
    /// );
    /// assert!(FileFormat::from_path(Path::new("cache.bin")).is_err());
    /// ```
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("txt") => Ok(Self::Text),
            other => Err(ParlanceError::Persistence(format!(
                "Unsupported file extension {:?} for {}; expected .json or .txt",
                other,
                path.display()
            ))
            .into()),
        }
    }
}

/// Entities that can round-trip through a durable file form
///
/// Implementors choose how to render themselves for each format; round-trip
/// of arbitrary text content (including embedded delimiters) must be
/// lossless.
pub trait Persistable: Sized {
    /// Render the entity for durable storage in the given format
    fn to_durable_form(&self, format: FileFormat) -> Result<String>;

    /// Reconstruct the entity from durable data in the given format
    fn from_durable_form(format: FileFormat, data: &str) -> Result<Self>;

    /// Write the entity to a file, format chosen by extension
    fn save(&self, path: &Path) -> Result<()> {
        let format = FileFormat::from_path(path)?;
        let data = self.to_durable_form(format)?;
        std::fs::write(path, data)?;
        tracing::debug!("Saved durable form to {}", path.display());
        Ok(())
    }

    /// Read the entity from a file, format chosen by extension
    fn load(path: &Path) -> Result<Self> {
        let format = FileFormat::from_path(path)?;
        let data = std::fs::read_to_string(path)?;
        Self::from_durable_form(format, &data)
    }
}
