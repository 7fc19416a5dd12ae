// src/measures/mod.rs
pub mod lexicon;
pub mod llm;
pub mod scorer;
