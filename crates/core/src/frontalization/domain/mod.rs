pub mod frontalization_stage;
pub mod frontalizer_chain;
