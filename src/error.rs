use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Token id {id} is outside the vocabulary (size {vocab_size})")]
    OutOfVocabulary { id: usize, vocab_size: usize },

    #[error("Length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ClassifierError>;
