pub mod content;
pub mod extractor;
pub mod generation;
pub mod handlers;
pub mod matcher;
pub mod pipeline;
pub mod scoring;
pub mod vocabulary;
