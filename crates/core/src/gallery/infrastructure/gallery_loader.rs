use std::fs;
use std::path::{Path, PathBuf};

use crate::gallery::domain::gallery::{Gallery, Person};
use crate::recognition::domain::embedding::Embedding;
use crate::recognition::domain::face_encoder::FaceEncoder;
use crate::shared::constants::{FRONTAL_FILE_NAME, REFERENCE_IMAGE_EXTENSIONS};
use crate::video::domain::image_reader::ImageReader;

use super::embedding_cache;

/// Default minimum embeddings a person needs to be enrolled.
pub const DEFAULT_MIN_REFERENCES: usize = 1;

/// Builds a [`Gallery`] from a directory of per-person photo folders and an
/// optional embedding cache.
///
/// ```text
/// gallery/
///   alice/  front.jpg  side.png  frontal.jpg
///   bob/    1.jpeg
/// ```
///
/// People and photos are visited in lexicographic order. Each photo is
/// encoded upright only; photos that can't be read or hold no face are
/// skipped with a warning.
pub struct GalleryLoader<'a> {
    reader: &'a dyn ImageReader,
    encoder: &'a mut dyn FaceEncoder,
    min_references: usize,
}

impl<'a> GalleryLoader<'a> {
    pub fn new(
        reader: &'a dyn ImageReader,
        encoder: &'a mut dyn FaceEncoder,
        min_references: usize,
    ) -> Self {
        Self {
            reader,
            encoder,
            min_references,
        }
    }

    /// Scans `root`, merges cached embeddings from `cache_dir`, and drops
    /// people below the reference minimum.
    pub fn load(&mut self, root: &Path, cache_dir: Option<&Path>) -> Gallery {
        let mut people = if root.is_dir() {
            self.scan_root(root)
        } else {
            log::warn!(
                "Gallery directory {} not found; starting with an empty gallery",
                root.display()
            );
            Vec::new()
        };

        if let Some(cache_dir) = cache_dir {
            merge_cached(&mut people, embedding_cache::load_dir(cache_dir));
        }

        let min = self.min_references;
        people.retain(|person| {
            let keep = person.embeddings.len() >= min;
            if !keep {
                log::warn!(
                    "Dropping {}: {} usable reference(s), need {min}",
                    person.name,
                    person.embeddings.len()
                );
            }
            keep
        });

        let gallery = Gallery::new(people);
        log::info!(
            "Gallery ready: {} people, {} embeddings",
            gallery.len(),
            gallery.embedding_count()
        );
        gallery
    }

    fn scan_root(&mut self, root: &Path) -> Vec<Person> {
        let person_dirs = match sorted_entries(root) {
            Ok(entries) => entries.into_iter().filter(|p| p.is_dir()).collect::<Vec<_>>(),
            Err(e) => {
                log::warn!("Cannot list gallery {}: {e}", root.display());
                return Vec::new();
            }
        };

        person_dirs
            .iter()
            .filter_map(|dir| {
                let name = dir.file_name()?.to_str()?.to_string();
                Some(self.enroll(name, dir))
            })
            .collect()
    }

    fn enroll(&mut self, name: String, dir: &Path) -> Person {
        let mut person = Person::new(name, Vec::new());
        let images = match sorted_entries(dir) {
            Ok(entries) => entries
                .into_iter()
                .filter(|p| p.is_file() && is_reference_image(p))
                .collect::<Vec<_>>(),
            Err(e) => {
                log::warn!("Cannot list {}: {e}", dir.display());
                Vec::new()
            }
        };

        for path in images {
            if is_frontal(&path) {
                person.frontal_image = Some(path.clone());
            }
            if let Some(embedding) = self.encode_reference(&path) {
                person.embeddings.push(embedding);
            }
            person.reference_images.push(path);
        }

        log::debug!(
            "Enrolled {} from {} photo(s), {} encoded",
            person.name,
            person.reference_images.len(),
            person.embeddings.len()
        );
        person
    }

    fn encode_reference(&mut self, path: &Path) -> Option<Embedding> {
        let image = match self.reader.read(path) {
            Ok(image) => image,
            Err(e) => {
                log::warn!("Skipping unreadable reference {}: {e}", path.display());
                return None;
            }
        };
        match self.encoder.encode(&image) {
            Ok(Some(embedding)) => Some(embedding),
            Ok(None) => {
                log::warn!("No face found in reference {}", path.display());
                None
            }
            Err(e) => {
                log::warn!("Failed to encode reference {}: {e}", path.display());
                None
            }
        }
    }
}

/// Appends cached embeddings to known people; unknown names become new
/// people after the scanned ones.
fn merge_cached(people: &mut Vec<Person>, cached: Vec<(String, Vec<Embedding>)>) {
    for (name, embeddings) in cached {
        match people.iter_mut().find(|p| p.name == name) {
            Some(person) => person.embeddings.extend(embeddings),
            None => people.push(Person::new(name, embeddings)),
        }
    }
}

fn sorted_entries(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect::<Vec<_>>();
    paths.sort();
    Ok(paths)
}

fn is_reference_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            REFERENCE_IMAGE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

fn is_frontal(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.eq_ignore_ascii_case(FRONTAL_FILE_NAME))
}
