use crate::classifier::BertClassifier;
use crate::data::EncodedBatch;
use crate::error::{ClassifierError, Result};
use burn::tensor::backend::Backend;
use std::fmt;

/// Per-example class probabilities, row-major `[rows, num_classes]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Probabilities {
    pub num_classes: usize,
    pub values: Vec<f32>,
}

impl Probabilities {
    pub fn rows(&self) -> usize {
        if self.num_classes == 0 {
            0
        } else {
            self.values.len() / self.num_classes
        }
    }

    pub fn shape(&self) -> [usize; 2] {
        [self.rows(), self.num_classes]
    }

    pub fn row(&self, index: usize) -> &[f32] {
        &self.values[index * self.num_classes..(index + 1) * self.num_classes]
    }
}

/// Runs the classifier over `inputs` in chunks of `batch_size`.
pub fn predict<B: Backend>(
    model: &BertClassifier<B>,
    inputs: &EncodedBatch,
    batch_size: usize,
    device: &B::Device,
) -> Result<Probabilities> {
    if batch_size == 0 {
        return Err(ClassifierError::Config(
            "batch_size must be at least 1".to_string(),
        ));
    }
    model.check_sequence_length(inputs.max_length)?;

    let mut num_classes = 0;
    let mut values = Vec::new();

    for start in (0..inputs.len()).step_by(batch_size) {
        let end = (start + batch_size).min(inputs.len());
        let probabilities = model.infer(inputs.slice(start..end).to_tensors(device));

        num_classes = probabilities.dims()[1];
        values.extend(probabilities.into_data().iter::<f32>());
    }

    Ok(Probabilities {
        num_classes,
        values,
    })
}

/// Index of the largest value in each row of a row-major matrix.
///
/// On ties the first index wins.
pub fn argmax_rows(values: &[f32], num_classes: usize) -> Vec<usize> {
    if num_classes == 0 {
        return Vec::new();
    }

    values
        .chunks(num_classes)
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |(best, max), (index, &value)| {
                    if value > max {
                        (index, value)
                    } else {
                        (best, max)
                    }
                })
                .0
        })
        .collect()
}

pub fn argmax(probabilities: &Probabilities) -> Vec<usize> {
    argmax_rows(&probabilities.values, probabilities.num_classes)
}

/// Fraction of positions where the prediction equals the ground truth.
///
/// Returns 0.0 for empty input.
pub fn accuracy(truth: &[usize], predicted: &[usize]) -> Result<f64> {
    if truth.len() != predicted.len() {
        return Err(ClassifierError::LengthMismatch {
            expected: truth.len(),
            actual: predicted.len(),
        });
    }
    if truth.is_empty() {
        return Ok(0.0);
    }

    let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / truth.len() as f64)
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub truth: Vec<usize>,
    pub predicted: Vec<usize>,
    pub probabilities: Probabilities,
    pub accuracy: f64,
}

pub fn evaluate<B: Backend>(
    model: &BertClassifier<B>,
    inputs: &EncodedBatch,
    labels: &[usize],
    batch_size: usize,
    device: &B::Device,
) -> Result<EvaluationReport> {
    let probabilities = predict(model, inputs, batch_size, device)?;
    let predicted = argmax(&probabilities);
    let accuracy = accuracy(labels, &predicted)?;

    Ok(EvaluationReport {
        truth: labels.to_vec(),
        predicted,
        probabilities,
        accuracy,
    })
}

struct LabelArray<'a>(&'a [usize]);

impl fmt::Display for LabelArray<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, label) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", label)?;
        }
        write!(f, "]")
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "===result===")?;
        writeln!(f, "{}", LabelArray(&self.truth))?;
        writeln!(f, "{}", LabelArray(&self.predicted))?;
        write!(f, "Accuracy: {:.5}", self.accuracy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::BertClassifierConfig;
    use crate::data::EncodedText;
    use crate::model::tests::tiny_config;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn perfect_prediction_scores_one() {
        let truth = [1, 0, 0, 1, 1];
        assert_eq!(accuracy(&truth, &[1, 0, 0, 1, 1]).unwrap(), 1.0);
    }

    #[test]
    fn one_miss_in_five_scores_point_eight() {
        let truth = [1, 0, 0, 1, 1];
        let score = accuracy(&truth, &[1, 0, 1, 1, 1]).unwrap();

        assert!((score - 0.8).abs() < 1e-12);
        assert_eq!(format!("{:.5}", score), "0.80000");
    }

    #[test]
    fn accuracy_rejects_length_mismatch() {
        assert!(matches!(
            accuracy(&[1, 0], &[1]),
            Err(ClassifierError::LengthMismatch {
                expected: 2,
                actual: 1
            })
        ));
        assert_eq!(accuracy(&[], &[]).unwrap(), 0.0);
    }

    #[test]
    fn argmax_prefers_first_index_on_ties() {
        let values = [0.5, 0.5, 0.2, 0.8, 0.9, 0.1];
        assert_eq!(argmax_rows(&values, 2), vec![0, 1, 0]);
        assert_eq!(argmax_rows(&[0.3, 0.3, 0.3], 3), vec![0]);
    }

    #[test]
    fn report_prints_the_result_block() {
        let report = EvaluationReport {
            truth: vec![1, 0, 0, 1, 1],
            predicted: vec![1, 0, 0, 1, 0],
            probabilities: Probabilities {
                num_classes: 2,
                values: vec![],
            },
            accuracy: 0.8,
        };

        assert_eq!(
            report.to_string(),
            "===result===\n[1 0 0 1 1]\n[1 0 0 1 0]\nAccuracy: 0.80000"
        );
    }

    #[test]
    fn predict_rejects_rows_wider_than_position_embeddings() {
        let device = Default::default();
        let model = BertClassifierConfig::new(tiny_config(10), 2).init::<B>(&device);
        let inputs = EncodedBatch {
            max_length: 40,
            rows: vec![EncodedText {
                token_ids: vec![2; 40],
                attention_mask: vec![1; 40],
                segment_ids: vec![0; 40],
            }],
        };

        assert!(matches!(
            predict(&model, &inputs, 2, &device),
            Err(ClassifierError::Config(_))
        ));
    }

    #[test]
    fn predict_chunks_and_keeps_row_order() {
        let device = Default::default();
        let model = BertClassifierConfig::new(tiny_config(10), 2).init::<B>(&device);
        let inputs = EncodedBatch {
            max_length: 4,
            rows: (0..5)
                .map(|i| EncodedText {
                    token_ids: vec![2, 4 + i, 3, 0],
                    attention_mask: vec![1, 1, 1, 0],
                    segment_ids: vec![0; 4],
                })
                .collect(),
        };

        let chunked = predict(&model, &inputs, 2, &device).unwrap();
        let whole = predict(&model, &inputs, 10, &device).unwrap();

        assert_eq!(chunked.shape(), [5, 2]);
        for (a, b) in chunked.values.iter().zip(&whole.values) {
            assert!((a - b).abs() < 1e-5);
        }
        for row in 0..5 {
            let sum: f32 = chunked.row(row).iter().sum();
            assert!((sum - 1.0).abs() < 1e-5);
        }
    }
}
