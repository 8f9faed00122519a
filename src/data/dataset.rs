use super::encoder::{EncodedBatch, EncodedText};
use crate::error::{ClassifierError, Result};
use burn::data::dataset::InMemDataset;
use std::fmt;

/// Number of sentiment classes.
pub const NUM_CLASSES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sentiment {
    Dislike = 0,
    Like = 1,
}

impl Sentiment {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Sentiment::Dislike),
            1 => Some(Sentiment::Like),
            _ => None,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentiment::Dislike => write!(f, "dislike"),
            Sentiment::Like => write!(f, "like"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledText {
    pub text: String,
    pub label: Sentiment,
}

impl LabeledText {
    pub fn new(text: impl Into<String>, label: Sentiment) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }
}

fn corpus(items: &[(&str, Sentiment)]) -> Vec<LabeledText> {
    items
        .iter()
        .map(|(text, label)| LabeledText::new(*text, *label))
        .collect()
}

/// Five hand-written sentences about liked and disliked animals.
pub fn training_corpus() -> Vec<LabeledText> {
    use Sentiment::*;
    corpus(&[
        ("この犬は可愛いです", Like),
        ("その猫は気まぐれです", Dislike),
        ("あの蛇は苦手です", Dislike),
        ("あのラクダは素敵です", Like),
        ("このカバは汚いです", Dislike),
    ])
}

/// Held-out sentences scored after training.
pub fn test_corpus() -> Vec<LabeledText> {
    use Sentiment::*;
    corpus(&[
        ("その猫はかわいいです", Like),
        ("どの鳥も嫌いです", Dislike),
        ("あのヤギは怖いです", Dislike),
        ("あのキリンは美しいです", Like),
        ("このサルは賢いです", Like),
    ])
}

pub fn texts(corpus: &[LabeledText]) -> Vec<&str> {
    corpus.iter().map(|item| item.text.as_str()).collect()
}

pub fn labels(corpus: &[LabeledText]) -> Vec<usize> {
    corpus.iter().map(|item| item.label.index()).collect()
}

/// Training item: an encoded text and its class index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedExample {
    pub input: EncodedText,
    pub label: usize,
}

/// Pairs encoded rows with their labels, in order.
pub fn encoded_examples(inputs: EncodedBatch, labels: &[usize]) -> Result<Vec<EncodedExample>> {
    if inputs.len() != labels.len() {
        return Err(ClassifierError::LengthMismatch {
            expected: inputs.len(),
            actual: labels.len(),
        });
    }

    Ok(inputs
        .rows
        .into_iter()
        .zip(labels.iter().copied())
        .map(|(input, label)| EncodedExample { input, label })
        .collect())
}

pub type SentimentDataset = InMemDataset<EncodedExample>;
