use crate::data::BertInferenceBatch;
use crate::embedding::{BertEmbeddings, BertEmbeddingsConfig};
use crate::error::ClassifierError;
use crate::pooler::{Pooler, PoolerConfig};
use burn::nn::transformer::{
    TransformerEncoder, TransformerEncoderConfig, TransformerEncoderInput,
};
use burn::nn::Initializer::KaimingUniform;
use burn::{
    config::Config,
    module::Module,
    tensor::{backend::Backend, Bool, Tensor},
};
use std::path::Path;

// Define the Bert model configuration
#[derive(Config, Debug)]
pub struct BertConfig {
    /// Number of attention heads in the multi-head attention
    pub num_attention_heads: usize,
    /// Number of transformer encoder layers/blocks
    pub num_hidden_layers: usize,
    /// Layer normalization epsilon
    pub layer_norm_eps: f64,
    /// Size of bert embedding (e.g., 768 for bert-base)
    pub hidden_size: usize,
    /// Size of the intermediate position wise feedforward layer
    pub intermediate_size: usize,
    /// Size of the vocabulary
    pub vocab_size: usize,
    /// Max position embeddings, 512 for BERT
    pub max_position_embeddings: usize,
    /// Identifier for sentence type in input (e.g., 0 for single sentence, 1 for pair)
    pub type_vocab_size: usize,
    /// Dropout value across layers, typically 0.1
    pub hidden_dropout_prob: f64,
    /// Index of the padding token
    #[config(default = 0)]
    pub pad_token_id: usize,
}

// Define the Bert model structure
#[derive(Module, Debug)]
pub struct BertModel<B: Backend> {
    pub embeddings: BertEmbeddings<B>,
    pub encoder: TransformerEncoder<B>,
    pub pooler: Pooler<B>,
}

#[derive(Debug, Clone)]
pub struct BertOutput<B: Backend> {
    /// Last encoder layer: [batch_size, seq_len, hidden_size]
    pub hidden_states: Tensor<B, 3>,
    /// Pooled [CLS] representation: [batch_size, hidden_size]
    pub pooled_output: Tensor<B, 2>,
}

impl BertConfig {
    /// Initializes a Bert model with default weights
    pub fn init<B: Backend>(&self, device: &B::Device) -> BertModel<B> {
        let embeddings = BertEmbeddingsConfig {
            vocab_size: self.vocab_size,
            max_position_embeddings: self.max_position_embeddings,
            type_vocab_size: self.type_vocab_size,
            hidden_size: self.hidden_size,
            hidden_dropout_prob: self.hidden_dropout_prob,
            layer_norm_eps: self.layer_norm_eps,
        }
        .init(device);

        let encoder = TransformerEncoderConfig::new(
            self.hidden_size,
            self.intermediate_size,
            self.num_attention_heads,
            self.num_hidden_layers,
        )
        .with_dropout(self.hidden_dropout_prob)
        .with_norm_first(false) // BERT-style post-LayerNorm
        .with_quiet_softmax(false)
        .with_initializer(KaimingUniform {
            gain: 1.0 / libm::sqrt(3.0),
            fan_out_only: false,
        })
        .init(device);

        let pooler = PoolerConfig::new(self.hidden_size).init(device);

        BertModel {
            embeddings,
            encoder,
            pooler,
        }
    }

    /// Load configuration from a HuggingFace config.json file.
    ///
    /// Extra fields in the config file are ignored.
    pub fn load_from_hf<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| ClassifierError::Config(e.to_string()))
    }
}

impl<B: Backend> BertModel<B> {
    /// Longest input the encoder accepts.
    pub fn max_sequence_length(&self) -> usize {
        self.embeddings.max_position_embeddings()
    }

    /// Defines forward pass
    pub fn forward(&self, input: BertInferenceBatch<B>) -> BertOutput<B> {
        let embedding = self
            .embeddings
            .forward(input.tokens, input.token_type_ids);

        // attention_mask: 1 = real, 0 = padding; mask_pad: true = padding
        let mask_pad: Tensor<B, 2, Bool> = input.attention_mask.equal_elem(0);

        let encoder_input = TransformerEncoderInput::new(embedding).mask_pad(mask_pad);
        let hidden_states = self.encoder.forward(encoder_input);
        let pooled_output = self.pooler.forward(hidden_states.clone());

        BertOutput {
            hidden_states,
            pooled_output,
        }
    }
}
