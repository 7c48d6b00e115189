pub mod file_ingestion;
pub mod normalizer;
pub mod orchestrator;
pub mod prompt_builder;

pub use normalizer::Normalizer;
pub use orchestrator::{BackendSlot, Fulfilled, Orchestrator};
