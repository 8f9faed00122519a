use super::dataset::EncodedExample;
use super::encoder::{stack_rows, BertInferenceBatch};
use burn::data::dataloader::batcher::Batcher;
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use std::marker::PhantomData;

/// Create one-hot encoded rows, flattened row-major: `[labels.len() * num_classes]`.
///
/// # Example
///
/// ```rust, ignore
/// let rows = one_hot(&[1, 0], 2);
/// // [0.0, 1.0, 1.0, 0.0]
/// ```
pub fn one_hot(labels: &[usize], num_classes: usize) -> Vec<f32> {
    let mut values = vec![0.0; labels.len() * num_classes];
    for (row, label) in labels.iter().enumerate() {
        values[row * num_classes + label] = 1.0;
    }
    values
}

#[derive(Clone, new)]
pub struct ClassificationBatcher<B: Backend> {
    /// Width of the one-hot targets
    num_classes: usize,
    _backend: PhantomData<B>,
}

#[derive(Debug, Clone)]
pub struct ClassificationBatch<B: Backend> {
    pub inputs: BertInferenceBatch<B>,
    /// One-hot targets: [batch_size, num_classes]
    pub targets: Tensor<B, 2>,
    /// Class indices, in batch order
    pub labels: Vec<usize>,
}

impl<B: Backend> Batcher<B, EncodedExample, ClassificationBatch<B>> for ClassificationBatcher<B> {
    fn batch(&self, items: Vec<EncodedExample>, device: &B::Device) -> ClassificationBatch<B> {
        let max_length = items.first().map(|item| item.input.token_ids.len()).unwrap_or(0);
        let rows = items.iter().map(|item| &item.input).collect::<Vec<_>>();
        let inputs = stack_rows(&rows, max_length, device);

        let labels = items.iter().map(|item| item.label).collect::<Vec<_>>();
        let targets = Tensor::<B, 2>::from_data(
            TensorData::new(
                one_hot(&labels, self.num_classes),
                [labels.len(), self.num_classes],
            ),
            device,
        );

        ClassificationBatch {
            inputs,
            targets,
            labels,
        }
    }
}
