pub mod format;
pub mod workdir; // Writable scratch directory cascade
pub mod strategy;
pub mod office; // LibreOffice headless conversion
pub mod extraction;
pub mod reconstruct;
pub mod word_text;
pub mod layout;
pub mod orchestrator;

pub use format::Direction;
pub use orchestrator::{ConversionError, ConversionResult, Converter};
