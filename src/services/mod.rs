pub mod assets;
pub mod bundle;
pub mod characters;
pub mod documents;
pub mod image;
pub mod llm;
pub mod markdown;
pub mod prompt;
pub mod report;
pub mod responses;
pub mod staleness;
pub mod workflow;
