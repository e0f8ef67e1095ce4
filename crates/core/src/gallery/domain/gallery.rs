use std::path::PathBuf;

use crate::recognition::domain::embedding::Embedding;

/// A known identity and the material it was enrolled from.
#[derive(Clone, Debug, PartialEq)]
pub struct Person {
    pub name: String,
    pub embeddings: Vec<Embedding>,
    /// Reference photos in enrollment order.
    pub reference_images: Vec<PathBuf>,
    /// Designated front-facing photo, when the person folder has one.
    pub frontal_image: Option<PathBuf>,
}

impl Person {
    pub fn new(name: impl Into<String>, embeddings: Vec<Embedding>) -> Self {
        Self {
            name: name.into(),
            embeddings,
            reference_images: Vec::new(),
            frontal_image: None,
        }
    }
}

/// Enrolled identities in a deterministic order.
///
/// Built once and read-only afterwards; iteration order decides matcher
/// ties, so the loader inserts people in a stable order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Gallery {
    people: Vec<Person>,
}

impl Gallery {
    pub fn new(people: Vec<Person>) -> Self {
        Self { people }
    }

    pub fn people(&self) -> &[Person] {
        &self.people
    }

    pub fn person(&self, name: &str) -> Option<&Person> {
        self.people.iter().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    pub fn embedding_count(&self) -> usize {
        self.people.iter().map(|p| p.embeddings.len()).sum()
    }
}
