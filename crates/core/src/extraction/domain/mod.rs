pub mod face_deduplicator;
pub mod perceptual_hash;
