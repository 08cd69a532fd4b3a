//! Index file reading.

use std::path::Path;

use crate::{Index, IndexError};

/// Read and parse an index file from disk.
///
/// A missing file is treated as an empty index, matching the teacher's
/// convention that a repository with no staged changes has no index file.
pub fn read_index(path: &Path) -> Result<Index, IndexError> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Index::new()),
        Err(e) => return Err(IndexError::Io(e)),
    };
    parse_index(&data)
}

/// Parse an index from raw JSON bytes.
pub fn parse_index(data: &[u8]) -> Result<Index, IndexError> {
    Ok(serde_json::from_slice(data)?)
}
