use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::gallery::domain::gallery::Gallery;
use crate::recognition::domain::embedding::Embedding;

const CACHE_EXTENSION: &str = "json";

#[derive(Error, Debug)]
pub enum EmbeddingCacheError {
    #[error("cannot access embedding cache {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid embedding cache data in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("embedding cache {path} has rows of differing or zero length")]
    Ragged { path: PathBuf },
}

/// Reads one `<person>.json` file: an array of equal-length number arrays.
pub fn load_file(path: &Path) -> Result<Vec<Embedding>, EmbeddingCacheError> {
    let file = fs::File::open(path).map_err(|e| EmbeddingCacheError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let rows: Vec<Embedding> =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| EmbeddingCacheError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

    if let Some(first) = rows.first() {
        let dim = first.dim();
        if dim == 0 || rows.iter().any(|r| r.dim() != dim) {
            return Err(EmbeddingCacheError::Ragged {
                path: path.to_path_buf(),
            });
        }
    }
    Ok(rows)
}

/// Loads every `*.json` file in `dir`, sorted by file name, as
/// `(person, embeddings)` pairs.
///
/// Unreadable or malformed files are skipped with a warning. A missing
/// directory yields nothing.
pub fn load_dir(dir: &Path) -> Vec<(String, Vec<Embedding>)> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Embedding cache {} unavailable: {e}", dir.display());
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case(CACHE_EXTENSION))
        })
        .collect();
    files.sort();

    files
        .into_iter()
        .filter_map(|path| {
            let name = path.file_stem()?.to_str()?.to_string();
            match load_file(&path) {
                Ok(embeddings) => Some((name, embeddings)),
                Err(e) => {
                    log::warn!("Skipping cache file: {e}");
                    None
                }
            }
        })
        .collect()
}

/// Writes each person's embeddings to `dir/<person>.json`, creating `dir`.
///
/// Returns the written paths in gallery order.
pub fn save(gallery: &Gallery, dir: &Path) -> Result<Vec<PathBuf>, EmbeddingCacheError> {
    fs::create_dir_all(dir).map_err(|e| EmbeddingCacheError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut written = Vec::with_capacity(gallery.len());
    for person in gallery.people() {
        let path = dir.join(format!("{}.{CACHE_EXTENSION}", person.name));
        let file = fs::File::create(&path).map_err(|e| EmbeddingCacheError::Io {
            path: path.clone(),
            source: e,
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &person.embeddings).map_err(|e| {
            EmbeddingCacheError::Parse {
                path: path.clone(),
                source: e,
            }
        })?;
        writer.flush().map_err(|e| EmbeddingCacheError::Io {
            path: path.clone(),
            source: e,
        })?;
        log::debug!(
            "Cached {} embeddings for {} at {}",
            person.embeddings.len(),
            person.name,
            path.display()
        );
        written.push(path);
    }
    Ok(written)
}
