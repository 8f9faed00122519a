#![recursion_limit = "256"] // wgpu

use bert_sentiment_burn::classifier::BertClassifierConfig;
use bert_sentiment_burn::data::{
    encoded_examples, labels, test_corpus, texts, training_corpus, TextEncoder,
};
use bert_sentiment_burn::evaluation::evaluate;
use bert_sentiment_burn::model::BertModel;
use bert_sentiment_burn::training::{train, TrainingConfig};
use burn::module::AutodiffModule;
use burn::tensor::backend::AutodiffBackend;
use std::env;
use std::sync::Arc;

#[cfg(not(feature = "f16"))]
#[allow(dead_code)]
type ElemType = f32;
#[cfg(feature = "f16")]
type ElemType = burn::tensor::f16;

pub fn launch<B: AutodiffBackend>(device: B::Device) -> bert_sentiment_burn::Result<()> {
    let mut config = TrainingConfig::new();
    if let Some(model_name) = env::args().nth(1) {
        // Any BERT checkpoint on the Hub, e.g. "tohoku-nlp/bert-base-japanese-v3"
        config.model_name = model_name;
    }

    println!("Model variant: {}", config.model_name);

    let (bert, tokenizer, bert_config) =
        BertModel::<B>::pretrained(&device, &config.model_name, None)?;
    let model = BertClassifierConfig::new(bert_config, config.num_classes)
        .init_with_encoder(bert, &device);

    let encoder = TextEncoder::new(Arc::new(tokenizer), config.max_length)?;

    let train_set = training_corpus();
    let test_set = test_corpus();

    for text in texts(&train_set) {
        for (id, piece) in encoder.token_pieces(text)? {
            println!("{} => {}", id, piece);
        }
    }
    let x_train = encoder.encode_batch(&texts(&train_set))?;
    let examples = encoded_examples(x_train, &labels(&train_set))?;

    // Training
    let (model, summary) = train(model, examples, &config, &device)?;
    if let Some(loss) = summary.final_loss() {
        println!("Final training loss: {:.4}", loss);
    }

    // Prediction
    for text in texts(&test_set) {
        for (id, piece) in encoder.token_pieces(text)? {
            println!("{} => {}", id, piece);
        }
    }
    let x_test = encoder.encode_batch(&texts(&test_set))?;
    let report = evaluate(
        &model.valid(),
        &x_test,
        &labels(&test_set),
        config.batch_size,
        &device,
    )?;

    println!("{}", report);
    Ok(())
}

#[cfg(feature = "ndarray")]
mod ndarray {
    use burn::backend::ndarray::{NdArray, NdArrayDevice};
    use burn::backend::Autodiff;

    use crate::{launch, ElemType};

    pub fn run() -> bert_sentiment_burn::Result<()> {
        launch::<Autodiff<NdArray<ElemType>>>(NdArrayDevice::Cpu)
    }
}

#[cfg(feature = "tch-gpu")]
mod tch_gpu {
    use crate::{launch, ElemType};
    use burn::backend::libtorch::{LibTorch, LibTorchDevice};
    use burn::backend::Autodiff;

    pub fn run() -> bert_sentiment_burn::Result<()> {
        #[cfg(not(target_os = "macos"))]
        let device = LibTorchDevice::Cuda(0);
        #[cfg(target_os = "macos")]
        let device = LibTorchDevice::Mps;

        launch::<Autodiff<LibTorch<ElemType>>>(device)
    }
}

#[cfg(feature = "tch-cpu")]
mod tch_cpu {
    use crate::{launch, ElemType};
    use burn::backend::libtorch::{LibTorch, LibTorchDevice};
    use burn::backend::Autodiff;

    pub fn run() -> bert_sentiment_burn::Result<()> {
        launch::<Autodiff<LibTorch<ElemType>>>(LibTorchDevice::Cpu)
    }
}

#[cfg(feature = "wgpu")]
mod wgpu {
    use crate::launch;
    use burn::backend::wgpu::{Wgpu, WgpuDevice};
    use burn::backend::Autodiff;

    pub fn run() -> bert_sentiment_burn::Result<()> {
        launch::<Autodiff<Wgpu>>(WgpuDevice::default())
    }
}

#[cfg(feature = "cuda")]
mod cuda {
    use crate::launch;
    use burn::backend::{cuda::CudaDevice, Autodiff, Cuda};

    pub fn run() -> bert_sentiment_burn::Result<()> {
        launch::<Autodiff<Cuda>>(CudaDevice::default())
    }
}

fn main() -> bert_sentiment_burn::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("bert_sentiment_burn=info")),
        )
        .init();

    #[cfg(feature = "ndarray")]
    ndarray::run()?;
    #[cfg(feature = "tch-gpu")]
    tch_gpu::run()?;
    #[cfg(feature = "tch-cpu")]
    tch_cpu::run()?;
    #[cfg(feature = "wgpu")]
    wgpu::run()?;
    #[cfg(feature = "cuda")]
    cuda::run()?;

    Ok(())
}
