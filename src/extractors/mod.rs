// src/extractors/mod.rs
pub mod normalize;
pub mod section;
