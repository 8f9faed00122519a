use crate::data::{BertInferenceBatch, ClassificationBatch};
use crate::error::ClassifierError;
use crate::model::{BertConfig, BertModel};
use burn::nn::{Initializer, Linear, LinearConfig};
use burn::tensor::activation::{log_softmax, softmax};
use burn::{
    config::Config,
    module::{Module, Param},
    tensor::{backend::Backend, Tensor},
};

#[derive(Config, Debug)]
pub struct BertClassifierConfig {
    /// Encoder configuration
    pub bert: BertConfig,
    /// Number of output classes
    pub num_classes: usize,
}

/// BERT encoder with a dense softmax head on the pooled output.
#[derive(Module, Debug)]
pub struct BertClassifier<B: Backend> {
    pub bert: BertModel<B>,
    output: Linear<B>,
}

impl BertClassifierConfig {
    /// Initializes the classifier with a randomly initialized encoder.
    pub fn init<B: Backend>(&self, device: &B::Device) -> BertClassifier<B> {
        self.init_with_encoder(self.bert.init(device), device)
    }

    /// Attaches a fresh classification head to an existing (usually pretrained) encoder.
    pub fn init_with_encoder<B: Backend>(
        &self,
        bert: BertModel<B>,
        device: &B::Device,
    ) -> BertClassifier<B> {
        let mut output = LinearConfig::new(self.bert.hidden_size, self.num_classes)
            .with_initializer(Initializer::XavierUniform { gain: 1.0 })
            .init(device);
        // Glorot-uniform kernel, zero bias
        output.bias = Some(Param::from_tensor(Tensor::zeros([self.num_classes], device)));

        BertClassifier { bert, output }
    }
}

impl<B: Backend> BertClassifier<B> {
    /// Rejects inputs wider than the encoder's position embeddings.
    pub fn check_sequence_length(&self, seq_len: usize) -> crate::Result<()> {
        let limit = self.bert.max_sequence_length();
        if seq_len > limit {
            return Err(ClassifierError::Config(format!(
                "sequence length {} exceeds max_position_embeddings {}",
                seq_len, limit
            )));
        }
        Ok(())
    }

    /// Class logits: [batch_size, num_classes]
    pub fn forward(&self, input: BertInferenceBatch<B>) -> Tensor<B, 2> {
        let output = self.bert.forward(input);
        self.output.forward(output.pooled_output)
    }

    /// Class probabilities: [batch_size, num_classes], rows sum to 1.
    pub fn infer(&self, input: BertInferenceBatch<B>) -> Tensor<B, 2> {
        softmax(self.forward(input), 1)
    }

    /// Categorical cross-entropy against the one-hot targets, with the logits.
    pub fn forward_loss(&self, batch: ClassificationBatch<B>) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(batch.inputs);
        let loss = categorical_cross_entropy(logits.clone(), batch.targets);

        (loss, logits)
    }
}

/// `mean(-sum(targets * log_softmax(logits)))` over the batch.
pub fn categorical_cross_entropy<B: Backend>(
    logits: Tensor<B, 2>,
    targets: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let log_probs = log_softmax(logits, 1);
    (targets * log_probs).sum_dim(1).neg().mean()
}
