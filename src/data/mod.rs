mod batcher;
mod dataset;
mod encoder;
mod tokenizer;

pub use batcher::*;
pub use dataset::*;
pub use encoder::*;
pub use tokenizer::*;
