use super::tokenizer::Tokenizer;
use crate::error::{ClassifierError, Result};
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor, TensorData};
use std::sync::Arc;

/// One text encoded to a fixed width.
///
/// All three arrays are exactly `max_length` long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedText {
    pub token_ids: Vec<i64>,
    /// 1 on real tokens, 0 on padding.
    pub attention_mask: Vec<i64>,
    /// Always 0 for single-sentence input.
    pub segment_ids: Vec<i64>,
}

impl EncodedText {
    /// Number of real (non-padding) tokens.
    pub fn len(&self) -> usize {
        self.attention_mask.iter().filter(|m| **m == 1).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Encoded texts sharing the same `max_length`, i.e. three `(N, L)` matrices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBatch {
    pub max_length: usize,
    pub rows: Vec<EncodedText>,
}

#[derive(Debug, Clone, new)]
pub struct BertInferenceBatch<B: Backend> {
    /// Token ids: [batch_size, max_seq_length]
    pub tokens: Tensor<B, 2, Int>,
    /// Attention mask, 1 = real token, 0 = padding: [batch_size, max_seq_length]
    pub attention_mask: Tensor<B, 2, Int>,
    /// Segment ids: [batch_size, max_seq_length]
    pub token_type_ids: Tensor<B, 2, Int>,
}

impl EncodedBatch {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sub-batch of the rows in `range`.
    pub fn slice(&self, range: std::ops::Range<usize>) -> EncodedBatch {
        EncodedBatch {
            max_length: self.max_length,
            rows: self.rows[range].to_vec(),
        }
    }

    /// Stacks the rows into model input tensors.
    pub fn to_tensors<B: Backend>(&self, device: &B::Device) -> BertInferenceBatch<B> {
        let rows = self.rows.iter().collect::<Vec<_>>();
        stack_rows(&rows, self.max_length, device)
    }
}

pub(crate) fn stack_rows<B: Backend>(
    rows: &[&EncodedText],
    max_length: usize,
    device: &B::Device,
) -> BertInferenceBatch<B> {
    let shape = [rows.len(), max_length];
    let flatten = |select: fn(&EncodedText) -> &Vec<i64>| {
        let values = rows
            .iter()
            .flat_map(|row| select(row).iter().copied())
            .collect::<Vec<i64>>();
        Tensor::<B, 2, Int>::from_data(TensorData::new(values, shape), device)
    };

    BertInferenceBatch {
        tokens: flatten(|row| &row.token_ids),
        attention_mask: flatten(|row| &row.attention_mask),
        token_type_ids: flatten(|row| &row.segment_ids),
    }
}

/// Turns raw text into fixed-width BERT inputs.
///
/// Layout of a row: `[CLS] subwords [SEP] [PAD]...`. Long texts lose their tail
/// (right truncation) and short ones are padded on the right.
#[derive(Clone)]
pub struct TextEncoder {
    tokenizer: Arc<dyn Tokenizer>,
    max_length: usize,
}

impl TextEncoder {
    pub fn new(tokenizer: Arc<dyn Tokenizer>, max_length: usize) -> Result<Self> {
        if max_length == 0 {
            return Err(ClassifierError::Config(
                "max_length must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            tokenizer,
            max_length,
        })
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
        &self.tokenizer
    }

    pub fn encode(&self, text: &str) -> Result<EncodedText> {
        let content = self.tokenizer.tokenize(text)?;
        let budget = self.max_length.saturating_sub(2);

        let mut ids = Vec::with_capacity(self.max_length);
        ids.push(self.tokenizer.cls_token());
        ids.extend(content.into_iter().take(budget));
        ids.push(self.tokenizer.sep_token());
        ids.truncate(self.max_length);

        let vocab_size = self.tokenizer.vocab_size();
        if let Some(&id) = ids.iter().find(|&&id| id >= vocab_size) {
            return Err(ClassifierError::OutOfVocabulary { id, vocab_size });
        }

        let real = ids.len();
        let mut token_ids = ids.into_iter().map(|id| id as i64).collect::<Vec<_>>();
        token_ids.resize(self.max_length, self.tokenizer.pad_token() as i64);

        let mut attention_mask = vec![1; real];
        attention_mask.resize(self.max_length, 0);

        Ok(EncodedText {
            token_ids,
            attention_mask,
            segment_ids: vec![0; self.max_length],
        })
    }

    pub fn encode_batch<S: AsRef<str>>(&self, texts: &[S]) -> Result<EncodedBatch> {
        let mut rows = Vec::with_capacity(texts.len());
        for text in texts {
            let text = text.as_ref();
            for (id, piece) in self.token_pieces(text)? {
                tracing::debug!("{} => {}", id, piece);
            }
            rows.push(self.encode(text)?);
        }

        Ok(EncodedBatch {
            max_length: self.max_length,
            rows,
        })
    }

    /// `(id, piece)` pairs of the marker-wrapped text, before truncation.
    pub fn token_pieces(&self, text: &str) -> Result<Vec<(usize, String)>> {
        let mut ids = vec![self.tokenizer.cls_token()];
        ids.extend(self.tokenizer.tokenize(text)?);
        ids.push(self.tokenizer.sep_token());

        ids.into_iter()
            .map(|id| Ok((id, self.tokenizer.decode(&[id])?)))
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use burn::backend::NdArray;
    use std::collections::HashMap;

    type B = NdArray<f32>;

    /// One token per character, ids assigned in first-seen order after the markers.
    pub(crate) struct CharTokenizer {
        vocab: HashMap<char, usize>,
        pieces: Vec<String>,
    }

    impl CharTokenizer {
        pub(crate) fn new(corpus: &[&str]) -> Self {
            let mut pieces = vec![
                "[PAD]".to_string(),
                "[UNK]".to_string(),
                "[CLS]".to_string(),
                "[SEP]".to_string(),
            ];
            let mut vocab = HashMap::new();
            for c in corpus.iter().flat_map(|text| text.chars()) {
                vocab.entry(c).or_insert_with(|| {
                    pieces.push(c.to_string());
                    pieces.len() - 1
                });
            }
            Self { vocab, pieces }
        }
    }

    impl Tokenizer for CharTokenizer {
        fn tokenize(&self, value: &str) -> Result<Vec<usize>> {
            Ok(value
                .chars()
                .map(|c| self.vocab.get(&c).copied().unwrap_or(1))
                .collect())
        }

        fn decode(&self, tokens: &[usize]) -> Result<String> {
            Ok(tokens.iter().map(|t| self.pieces[*t].as_str()).collect())
        }

        fn vocab_size(&self) -> usize {
            self.pieces.len()
        }

        fn pad_token(&self) -> usize {
            0
        }

        fn cls_token(&self) -> usize {
            2
        }

        fn sep_token(&self) -> usize {
            3
        }
    }

    /// Returns ids beyond its own vocabulary.
    struct BrokenTokenizer;

    impl Tokenizer for BrokenTokenizer {
        fn tokenize(&self, _value: &str) -> Result<Vec<usize>> {
            Ok(vec![99])
        }

        fn decode(&self, _tokens: &[usize]) -> Result<String> {
            Ok(String::new())
        }

        fn vocab_size(&self) -> usize {
            4
        }

        fn pad_token(&self) -> usize {
            0
        }

        fn cls_token(&self) -> usize {
            2
        }

        fn sep_token(&self) -> usize {
            3
        }
    }

    fn encoder(max_length: usize) -> TextEncoder {
        let tokenizer = CharTokenizer::new(&["abcdefghij"]);
        TextEncoder::new(Arc::new(tokenizer), max_length).unwrap()
    }

    #[test]
    fn rows_have_exact_length_for_any_max_length() {
        for max_length in 1..20 {
            let encoder = encoder(max_length);
            for text in ["", "a", "abc", "abcdefghij", "abcdefghijabcdefghij"] {
                let row = encoder.encode(text).unwrap();
                assert_eq!(row.token_ids.len(), max_length);
                assert_eq!(row.attention_mask.len(), max_length);
                assert_eq!(row.segment_ids.len(), max_length);
            }
        }
    }

    #[test]
    fn short_text_is_wrapped_and_right_padded() {
        let row = encoder(8).encode("abc").unwrap();

        assert_eq!(row.token_ids, vec![2, 4, 5, 6, 3, 0, 0, 0]);
        assert_eq!(row.attention_mask, vec![1, 1, 1, 1, 1, 0, 0, 0]);
        assert_eq!(row.segment_ids, vec![0; 8]);
        assert_eq!(row.len(), 5);
    }

    #[test]
    fn mask_marks_exactly_the_real_tokens() {
        let encoder = encoder(12);
        for text in ["", "a", "abcde", "abcdefghijabc"] {
            let row = encoder.encode(text).unwrap();
            let real = (text.chars().count() + 2).min(12);
            for (position, mask) in row.attention_mask.iter().enumerate() {
                assert_eq!(*mask, i64::from(position < real));
            }
        }
    }

    #[test]
    fn long_text_is_cut_to_max_length_with_markers() {
        let row = encoder(5).encode("abcdefghij").unwrap();

        assert_eq!(row.token_ids, vec![2, 4, 5, 6, 3]);
        assert_eq!(row.attention_mask, vec![1; 5]);
    }

    #[test]
    fn tiny_max_length_keeps_leading_markers() {
        assert_eq!(encoder(1).encode("abc").unwrap().token_ids, vec![2]);
        assert_eq!(encoder(2).encode("abc").unwrap().token_ids, vec![2, 3]);
    }

    #[test]
    fn encoding_is_idempotent() {
        let encoder = encoder(6);
        assert_eq!(
            encoder.encode("abcdefg").unwrap(),
            encoder.encode("abcdefg").unwrap()
        );
    }

    #[test]
    fn empty_input_gives_empty_batch() {
        let batch = encoder(15).encode_batch::<&str>(&[]).unwrap();

        assert!(batch.is_empty());
        assert_eq!(batch.max_length, 15);
    }

    #[test]
    fn zero_max_length_is_rejected() {
        let tokenizer = Arc::new(CharTokenizer::new(&["a"]));
        assert!(TextEncoder::new(tokenizer, 0).is_err());
    }

    #[test]
    fn out_of_vocabulary_ids_are_rejected() {
        let encoder = TextEncoder::new(Arc::new(BrokenTokenizer), 4).unwrap();

        let err = encoder.encode("x").unwrap_err();

        assert!(matches!(
            err,
            ClassifierError::OutOfVocabulary {
                id: 99,
                vocab_size: 4
            }
        ));
    }

    #[test]
    fn token_pieces_include_markers() {
        let pieces = encoder(3).token_pieces("ab").unwrap();

        assert_eq!(
            pieces,
            vec![
                (2, "[CLS]".to_string()),
                (4, "a".to_string()),
                (5, "b".to_string()),
                (3, "[SEP]".to_string()),
            ]
        );
    }

    #[test]
    fn batch_converts_to_tensors() {
        let device = Default::default();
        let batch = encoder(6).encode_batch(&["ab", "abcdefgh"]).unwrap();

        let input = batch.to_tensors::<B>(&device);

        assert_eq!(input.tokens.dims(), [2, 6]);
        assert_eq!(input.attention_mask.dims(), [2, 6]);
        assert_eq!(input.token_type_ids.dims(), [2, 6]);
        let mask = input.attention_mask.into_data().iter::<i64>().collect::<Vec<_>>();
        assert_eq!(mask, vec![1, 1, 1, 1, 0, 0, 1, 1, 1, 1, 1, 1]);
    }
}
