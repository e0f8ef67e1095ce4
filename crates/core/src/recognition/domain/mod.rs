pub mod embedding;
pub mod face_encoder;
pub mod identity_matcher;
pub mod rotating_encoder;
pub mod rotation;
