pub mod embedding_cache;
pub mod gallery_loader;
