use crate::classifier::BertClassifier;
use crate::data::{ClassificationBatcher, EncodedExample, SentimentDataset};
use crate::error::ClassifierError;
use crate::evaluation::argmax_rows;
use crate::loader::DEFAULT_MODEL;
use burn::{
    config::Config,
    data::dataloader::DataLoaderBuilder,
    grad_clipping::GradientClippingConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, ElementConversion},
};

#[derive(Config, Debug)]
pub struct TrainingConfig {
    #[config(default = 2)]
    pub num_classes: usize,

    #[config(default = 15)]
    pub max_length: usize,

    #[config(default = 10)]
    pub batch_size: usize,

    #[config(default = 3)]
    pub num_epochs: usize,

    #[config(default = 3e-5)]
    pub learning_rate: f64,

    #[config(default = 1e-8)]
    pub adam_epsilon: f32,

    #[config(default = 1.0)]
    pub grad_clip_norm: f32,

    #[config(default = 42)]
    pub seed: u64,

    #[config(default = "DEFAULT_MODEL.to_string()")]
    pub model_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpochSummary {
    pub epoch: usize,
    pub loss: f64,
    pub accuracy: f64,
    pub steps: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSummary {
    pub epochs: Vec<EpochSummary>,
}

impl TrainingSummary {
    pub fn steps(&self) -> usize {
        self.epochs.iter().map(|epoch| epoch.steps).sum()
    }

    pub fn final_loss(&self) -> Option<f64> {
        self.epochs.last().map(|epoch| epoch.loss)
    }
}

/// Fine-tunes `model` on `examples`, one Adam step per batch.
///
/// Runs every configured epoch; there is no validation split, early stopping or
/// checkpointing. A training set smaller than the batch size yields a single
/// undersized batch per epoch.
pub fn train<B: AutodiffBackend>(
    model: BertClassifier<B>,
    examples: Vec<EncodedExample>,
    config: &TrainingConfig,
    device: &B::Device,
) -> crate::Result<(BertClassifier<B>, TrainingSummary)> {
    if config.batch_size == 0 {
        return Err(ClassifierError::Config(
            "batch_size must be at least 1".to_string(),
        ));
    }
    if let Some(width) = examples.iter().map(|item| item.input.token_ids.len()).max() {
        model.check_sequence_length(width)?;
    }

    let mut optim = AdamConfig::new()
        .with_epsilon(config.adam_epsilon)
        .with_grad_clipping(Some(GradientClippingConfig::Norm(config.grad_clip_norm)))
        .init();

    let batcher = ClassificationBatcher::<B>::new(config.num_classes);
    let dataloader = DataLoaderBuilder::new(batcher)
        .batch_size(config.batch_size)
        .shuffle(config.seed)
        .set_device(device.clone())
        .build(SentimentDataset::new(examples));

    let mut model = model;
    let mut summary = TrainingSummary::default();

    for epoch in 1..=config.num_epochs {
        let mut loss_sum = 0.0;
        let mut correct = 0;
        let mut seen = 0;
        let mut steps = 0;

        for batch in dataloader.iter() {
            let labels = batch.labels.clone();
            let (loss, logits) = model.forward_loss(batch);

            let [_, num_classes] = logits.dims();
            let logits = logits.into_data().iter::<f32>().collect::<Vec<_>>();
            let predicted = argmax_rows(&logits, num_classes);
            correct += predicted
                .iter()
                .zip(&labels)
                .filter(|(p, l)| p == l)
                .count();
            seen += labels.len();

            loss_sum += loss.clone().into_scalar().elem::<f64>();
            steps += 1;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(config.learning_rate, model, grads);
        }

        let epoch_summary = EpochSummary {
            epoch,
            loss: if steps > 0 { loss_sum / steps as f64 } else { 0.0 },
            accuracy: if seen > 0 { correct as f64 / seen as f64 } else { 0.0 },
            steps,
        };
        tracing::info!(
            "Epoch {}/{} - loss: {:.4} - acc: {:.4}",
            epoch,
            config.num_epochs,
            epoch_summary.loss,
            epoch_summary.accuracy
        );
        summary.epochs.push(epoch_summary);
    }

    Ok((model, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::BertClassifierConfig;
    use crate::data::{encoded_examples, EncodedBatch, EncodedText};
    use crate::model::tests::tiny_config;
    use burn::backend::{Autodiff, NdArray};

    type B = Autodiff<NdArray<f32>>;

    fn examples(count: usize) -> Vec<EncodedExample> {
        let rows = (0..count)
            .map(|i| EncodedText {
                token_ids: vec![2, 4 + (i % 5) as i64, 3, 0],
                attention_mask: vec![1, 1, 1, 0],
                segment_ids: vec![0; 4],
            })
            .collect();
        let labels = (0..count).map(|i| i % 2).collect::<Vec<_>>();

        encoded_examples(
            EncodedBatch {
                max_length: 4,
                rows,
            },
            &labels,
        )
        .unwrap()
    }

    #[test]
    fn defaults_match_the_reference_setup() {
        let config = TrainingConfig::new();

        assert_eq!(config.num_classes, 2);
        assert_eq!(config.max_length, 15);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.num_epochs, 3);
        assert_eq!(config.learning_rate, 3e-5);
        assert_eq!(config.adam_epsilon, 1e-8);
        assert_eq!(config.grad_clip_norm, 1.0);
        assert_eq!(config.model_name, "cl-tohoku/bert-base-japanese");
    }

    #[test]
    fn small_training_set_uses_one_undersized_batch_per_epoch() {
        let device = Default::default();
        let model = BertClassifierConfig::new(tiny_config(10), 2).init::<B>(&device);

        let (_, summary) = train(model, examples(5), &TrainingConfig::new(), &device).unwrap();

        assert_eq!(summary.epochs.len(), 3);
        assert!(summary.epochs.iter().all(|epoch| epoch.steps == 1));
        assert_eq!(summary.steps(), 3);
        assert!(summary.final_loss().unwrap().is_finite());
    }

    #[test]
    fn last_batch_may_be_smaller() {
        let device = Default::default();
        let model = BertClassifierConfig::new(tiny_config(10), 2).init::<B>(&device);
        let config = TrainingConfig::new().with_batch_size(2).with_num_epochs(1);

        let (_, summary) = train(model, examples(5), &config, &device).unwrap();

        assert_eq!(summary.epochs[0].steps, 3);
        assert!((0.0..=1.0).contains(&summary.epochs[0].accuracy));
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let device = Default::default();
        let model = BertClassifierConfig::new(tiny_config(10), 2).init::<B>(&device);
        let config = TrainingConfig::new().with_batch_size(0);

        assert!(matches!(
            train(model, examples(2), &config, &device),
            Err(ClassifierError::Config(_))
        ));
    }

    #[test]
    fn rows_wider_than_position_embeddings_are_rejected() {
        let device = Default::default();
        let model = BertClassifierConfig::new(tiny_config(10), 2).init::<B>(&device);
        let mut token_ids = vec![0; 40];
        token_ids[..3].copy_from_slice(&[2, 5, 3]);
        let examples = encoded_examples(
            EncodedBatch {
                max_length: 40,
                rows: vec![EncodedText {
                    attention_mask: token_ids.iter().map(|t| i64::from(*t != 0)).collect(),
                    segment_ids: vec![0; 40],
                    token_ids,
                }],
            },
            &[1],
        )
        .unwrap();

        assert!(matches!(
            train(model, examples, &TrainingConfig::new(), &device),
            Err(ClassifierError::Config(_))
        ));
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = TrainingConfig::new().with_num_epochs(7);

        let json = serde_json::to_string(&config).unwrap();
        let loaded: TrainingConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(loaded.num_epochs, 7);
        assert_eq!(loaded.batch_size, 10);
    }
}
