use burn::config::Config;
use burn::module::Module;
use burn::nn::{Dropout, DropoutConfig, Embedding, EmbeddingConfig, LayerNorm, LayerNormConfig};
use burn::tensor::backend::Backend;
use burn::tensor::{Float, Int, Tensor};

#[derive(Config, Debug)]
pub struct BertEmbeddingsConfig {
    pub vocab_size: usize,
    pub max_position_embeddings: usize,
    pub type_vocab_size: usize,
    pub hidden_size: usize,
    pub hidden_dropout_prob: f64,
    pub layer_norm_eps: f64,
}

/// Word, position and segment embeddings summed, then normalized.
#[derive(Module, Debug)]
pub struct BertEmbeddings<B: Backend> {
    word_embeddings: Embedding<B>,
    position_embeddings: Embedding<B>,
    token_type_embeddings: Embedding<B>,
    layer_norm: LayerNorm<B>,
    dropout: Dropout,
    max_position_embeddings: usize,
}

impl BertEmbeddingsConfig {
    /// Initializes BertEmbeddings with default weights
    pub fn init<B: Backend>(&self, device: &B::Device) -> BertEmbeddings<B> {
        let word_embeddings = EmbeddingConfig::new(self.vocab_size, self.hidden_size).init(device);
        let position_embeddings =
            EmbeddingConfig::new(self.max_position_embeddings, self.hidden_size).init(device);
        let token_type_embeddings =
            EmbeddingConfig::new(self.type_vocab_size, self.hidden_size).init(device);
        let layer_norm = LayerNormConfig::new(self.hidden_size)
            .with_epsilon(self.layer_norm_eps)
            .init(device);

        let dropout = DropoutConfig::new(self.hidden_dropout_prob).init();

        BertEmbeddings {
            word_embeddings,
            position_embeddings,
            token_type_embeddings,
            layer_norm,
            dropout,
            max_position_embeddings: self.max_position_embeddings,
        }
    }
}

impl<B: Backend> BertEmbeddings<B> {
    /// Longest sequence the position embeddings can index.
    pub fn max_position_embeddings(&self) -> usize {
        self.max_position_embeddings
    }

    /// Embeds `input_ids` and `token_type_ids`, both of dim: [batch_size, seq_len]
    pub fn forward(
        &self,
        input_ids: Tensor<B, 2, Int>,
        token_type_ids: Tensor<B, 2, Int>,
    ) -> Tensor<B, 3, Float> {
        let [batch_size, seq_len] = input_ids.dims();
        let device = &input_ids.device();

        let inputs_embeds = self.word_embeddings.forward(input_ids);
        let token_type_embeddings = self.token_type_embeddings.forward(token_type_ids);

        // BERT positions are absolute: 0..seq_len for every row
        let position_ids = Tensor::arange(0..seq_len as i64, device)
            .reshape([1, seq_len])
            .expand([batch_size, seq_len]);
        let position_embeddings = self.position_embeddings.forward(position_ids);

        let embeddings = inputs_embeds + token_type_embeddings + position_embeddings;

        let embeddings = self.layer_norm.forward(embeddings);
        self.dropout.forward(embeddings)
    }
}
