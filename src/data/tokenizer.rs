use crate::error::{ClassifierError, Result};
use std::path::Path;
use tokenizers::decoders::wordpiece::WordPiece as WordPieceDecoder;
use tokenizers::models::wordpiece::WordPiece;
use tokenizers::normalizers::bert::BertNormalizer;
use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
use tokenizers::processors::bert::BertProcessing;

pub const PAD_TOKEN: &str = "[PAD]";
pub const UNK_TOKEN: &str = "[UNK]";
pub const CLS_TOKEN: &str = "[CLS]";
pub const SEP_TOKEN: &str = "[SEP]";

pub trait Tokenizer: Send + Sync {
    /// Converts a text string into subword ids, without boundary markers.
    fn tokenize(&self, value: &str) -> Result<Vec<usize>>;

    /// Converts a sequence of tokens back into a text string.
    fn decode(&self, tokens: &[usize]) -> Result<String>;

    /// Gets the size of the tokenizer's vocabulary.
    fn vocab_size(&self) -> usize;

    /// Gets the token used for padding sequences to a consistent length.
    fn pad_token(&self) -> usize;

    /// Gets the marker prepended to every sequence.
    fn cls_token(&self) -> usize;

    /// Gets the marker appended to every sequence.
    fn sep_token(&self) -> usize;

    /// Gets the string representation of the padding token.
    /// The default implementation uses `decode` on the padding token.
    fn pad_token_value(&self) -> Result<String> {
        self.decode(&[self.pad_token()])
    }
}

/// WordPiece tokenizer used by BERT checkpoints on the HuggingFace Hub.
pub struct BertTokenizer {
    // The underlying tokenizer from the `tokenizers` library.
    tokenizer: tokenizers::Tokenizer,
    pad_token: usize,
    cls_token: usize,
    sep_token: usize,
}

impl BertTokenizer {
    /// Loads a serialized `tokenizer.json`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut tokenizer = tokenizers::Tokenizer::from_file(path)
            .map_err(|e| ClassifierError::Tokenizer(format!("Failed to load tokenizer: {}", e)))?;

        // Sequence length is owned by the text encoder.
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(None)
            .map_err(|e| ClassifierError::Tokenizer(e.to_string()))?;

        Self::from_tokenizer(tokenizer)
    }

    /// Builds a BERT WordPiece tokenizer from a plain `vocab.txt`.
    ///
    /// Some checkpoints (e.g. `cl-tohoku/bert-base-japanese`) only ship the vocabulary.
    /// The pipeline mirrors the reference BERT tokenizer: text cleanup, CJK ideographs
    /// split into single characters, whitespace/punctuation pre-tokenization and
    /// greedy longest-match WordPiece.
    pub fn from_vocab(path: impl AsRef<Path>, lowercase: bool) -> Result<Self> {
        let vocab = path.as_ref().to_string_lossy().to_string();
        let wordpiece = WordPiece::from_file(&vocab)
            .unk_token(UNK_TOKEN.to_string())
            .build()
            .map_err(|e| ClassifierError::Tokenizer(format!("Failed to read vocab: {}", e)))?;

        let mut tokenizer = tokenizers::Tokenizer::new(wordpiece);
        tokenizer.with_normalizer(Some(BertNormalizer::new(true, true, None, lowercase)));
        tokenizer.with_pre_tokenizer(Some(BertPreTokenizer));
        tokenizer.with_decoder(Some(WordPieceDecoder::default()));

        let cls = special_token_id(&tokenizer, CLS_TOKEN)?;
        let sep = special_token_id(&tokenizer, SEP_TOKEN)?;
        tokenizer.with_post_processor(Some(BertProcessing::new(
            (SEP_TOKEN.to_string(), sep),
            (CLS_TOKEN.to_string(), cls),
        )));

        Self::from_tokenizer(tokenizer)
    }

    fn from_tokenizer(tokenizer: tokenizers::Tokenizer) -> Result<Self> {
        let pad_token = special_token_id(&tokenizer, PAD_TOKEN)? as usize;
        let cls_token = special_token_id(&tokenizer, CLS_TOKEN)? as usize;
        let sep_token = special_token_id(&tokenizer, SEP_TOKEN)? as usize;

        Ok(Self {
            tokenizer,
            pad_token,
            cls_token,
            sep_token,
        })
    }
}

fn special_token_id(tokenizer: &tokenizers::Tokenizer, token: &str) -> Result<u32> {
    tokenizer
        .token_to_id(token)
        .ok_or_else(|| ClassifierError::Tokenizer(format!("Missing special token {}", token)))
}

impl Tokenizer for BertTokenizer {
    fn tokenize(&self, value: &str) -> Result<Vec<usize>> {
        let encoding = self
            .tokenizer
            .encode(value, false)
            .map_err(|e| ClassifierError::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().iter().map(|t| *t as usize).collect())
    }

    fn decode(&self, tokens: &[usize]) -> Result<String> {
        let tokens = tokens.iter().map(|t| *t as u32).collect::<Vec<u32>>();
        self.tokenizer
            .decode(&tokens, false)
            .map_err(|e| ClassifierError::Tokenizer(e.to_string()))
    }

    fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }

    fn pad_token(&self) -> usize {
        self.pad_token
    }

    fn cls_token(&self) -> usize {
        self.cls_token
    }

    fn sep_token(&self) -> usize {
        self.sep_token
    }
}
