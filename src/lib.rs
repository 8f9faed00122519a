//! BERT sentiment classifier for Burn.
//!
//! Fine-tunes a pretrained BERT encoder with a dense softmax head on a handful of
//! labeled sentences, then scores held-out sentences:
//!
//! 1. [`data::TextEncoder`] turns text into fixed-width token ids, attention mask
//!    and segment ids.
//! 2. [`classifier::BertClassifier`] puts a linear layer on the pooled [CLS] output.
//! 3. [`training::train`] runs Adam with gradient-norm clipping for a fixed number of epochs.
//! 4. [`evaluation::evaluate`] reduces probabilities with arg-max and reports accuracy.
//!
//! # Example
//!
//! ```ignore
//! use bert_sentiment_burn::{classifier::BertClassifierConfig, model::BertModel};
//! use burn::backend::{Autodiff, NdArray};
//!
//! type B = Autodiff<NdArray<f32>>;
//!
//! let device = Default::default();
//! let (bert, tokenizer, config) =
//!     BertModel::<B>::pretrained(&device, "cl-tohoku/bert-base-japanese", None)?;
//! let model = BertClassifierConfig::new(config, 2).init_with_encoder(bert, &device);
//! ```

#[macro_use]
extern crate derive_new;

pub mod classifier;
pub mod data;
mod embedding;
pub mod error;
pub mod evaluation;
pub mod loader;
pub mod model;
pub mod pooler;
pub mod training;

pub use error::{ClassifierError, Result};
