use burn::{
    config::Config,
    module::Module,
    nn::{Linear, LinearConfig},
    tensor::{backend::Backend, Tensor},
};
use derive_new::new;

/// Pooler
#[derive(Module, Debug, new)]
pub struct Pooler<B: Backend> {
    /// Linear output
    output: Linear<B>,
}

impl<B: Backend> Pooler<B> {
    /// Summarizes each sequence by its first ([CLS]) hidden state.
    ///
    /// `[batch_size, seq_len, hidden_size]` -> `[batch_size, hidden_size]`
    pub fn forward(&self, encoder_output: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch_size, _, hidden_size] = encoder_output.dims();

        let first_token = encoder_output
            .slice([0..batch_size, 0..1])
            .reshape([batch_size, hidden_size]);

        self.output.forward(first_token).tanh()
    }
}

/// Pooler Configuration
#[derive(Config, Debug)]
pub struct PoolerConfig {
    /// Hidden size
    pub hidden_size: usize,
}

impl PoolerConfig {
    /// Initialize a new Pooler module.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Pooler<B> {
        let output = LinearConfig::new(self.hidden_size, self.hidden_size).init(device);

        Pooler::new(output)
    }
}
