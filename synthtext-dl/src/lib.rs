//! Data loading toolkit for grounded text-to-image training on SynthText.

mod common;
pub mod dataset;
pub mod embedding;
pub mod processor;
