// Loads BERT encoders and their tokenizers from the formats published on the Hugging Face Hub.

use crate::error::{ClassifierError, Result};
use crate::model::{BertConfig, BertModel};
use burn::tensor::backend::Backend;
use burn_store::{
    KeyRemapper, ModuleSnapshot, PyTorchToBurnAdapter, PytorchStore, SafetensorsStore,
};
use std::path::{Path, PathBuf};

#[cfg(feature = "pretrained")]
use crate::data::BertTokenizer;

/// Default checkpoint: BERT-base trained on Japanese Wikipedia.
pub const DEFAULT_MODEL: &str = "cl-tohoku/bert-base-japanese";

/// Serialized encoder weights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeightsFile {
    Safetensors(PathBuf),
    PyTorch(PathBuf),
}

/// Where the tokenizer definition comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenizerFile {
    /// A serialized `tokenizer.json`.
    Json(PathBuf),
    /// A bare WordPiece `vocab.txt`.
    Vocab { path: PathBuf, lowercase: bool },
}

// Key mappings: HuggingFace BERT -> Burn modules.
// Applied in order, so more specific patterns come first.
const KEY_MAPPINGS: [(&str, &str); 14] = [
    // Remove bert. prefix
    ("^bert\\.(.+)", "$1"),
    // encoder.layer.X -> encoder.layers.X
    ("encoder\\.layer\\.([0-9]+)", "encoder.layers.$1"),
    // Attention mappings
    ("attention\\.self\\.query", "mha.query"),
    ("attention\\.self\\.key", "mha.key"),
    ("attention\\.self\\.value", "mha.value"),
    ("attention\\.output\\.dense", "mha.output"),
    ("attention\\.output\\.LayerNorm", "norm_1"),
    // Feed-forward mappings
    ("intermediate\\.dense", "pwff.linear_inner"),
    // Must not catch "attention.output.dense", already renamed above
    ("(layers\\.[0-9]+)\\.output\\.dense", "$1.pwff.linear_outer"),
    ("(layers\\.[0-9]+)\\.output\\.LayerNorm", "$1.norm_2"),
    ("embeddings\\.LayerNorm", "embeddings.layer_norm"),
    ("pooler\\.dense", "pooler.output"),
    // Checkpoints use either weight/bias or gamma/beta for layer norms
    ("(norm_[12]|layer_norm)\\.(weight|gamma)$", "$1.gamma"),
    ("(norm_[12]|layer_norm)\\.(bias|beta)$", "$1.beta"),
];

fn key_remapper() -> Result<KeyRemapper> {
    KeyRemapper::from_patterns(KEY_MAPPINGS.to_vec())
        .map_err(|e| ClassifierError::Store(e.to_string()))
}

/// Load pre-trained weights into the encoder.
///
/// Keys of other heads stored in the checkpoint (e.g. `cls.predictions.*`) are ignored.
pub fn load_pretrained<B: Backend>(model: &mut BertModel<B>, weights: &WeightsFile) -> Result<()> {
    let remapper = key_remapper()?;

    match weights {
        WeightsFile::Safetensors(path) => {
            let mut store = SafetensorsStore::from_file(path.clone())
                .with_from_adapter(PyTorchToBurnAdapter)
                .remap(remapper);
            model
                .load_from(&mut store)
                .map_err(|e| ClassifierError::Store(e.to_string()))?;
        }
        WeightsFile::PyTorch(path) => {
            let mut store = PytorchStore::from_file(path.clone()).remap(remapper);
            model
                .load_from(&mut store)
                .map_err(|e| ClassifierError::Store(e.to_string()))?;
        }
    }

    tracing::info!("Loaded encoder weights from {:?}", weights);
    Ok(())
}

/// Load model configuration from a JSON file.
pub fn load_config(path: impl AsRef<Path>) -> Result<BertConfig> {
    BertConfig::load_from_hf(path)
}

/// Reads `do_lower_case` from a `tokenizer_config.json`, defaulting to false.
pub fn lowercase_from_tokenizer_config(path: impl AsRef<Path>) -> Result<bool> {
    let content = std::fs::read_to_string(path)?;
    let value: serde_json::Value =
        serde_json::from_str(&content).map_err(|e| ClassifierError::Config(e.to_string()))?;

    Ok(value
        .get("do_lower_case")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false))
}

#[cfg(feature = "pretrained")]
pub struct HfModelFiles {
    pub config_path: PathBuf,
    pub weights: WeightsFile,
    pub tokenizer: TokenizerFile,
}

#[cfg(feature = "pretrained")]
fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("burn-models")
}

/// Download model config, weights and tokenizer files from the Hugging Face Hub.
///
/// Files are cached and won't be downloaded again. Repositories without
/// `model.safetensors` fall back to `pytorch_model.bin`; repositories without
/// `tokenizer.json` fall back to `vocab.txt`.
#[cfg(feature = "pretrained")]
pub fn download_hf_model(model_name: &str, cache_dir: Option<PathBuf>) -> Result<HfModelFiles> {
    let cache_dir = cache_dir.unwrap_or_else(default_cache_dir);
    let api = hf_hub::api::sync::ApiBuilder::new()
        .with_cache_dir(cache_dir)
        .build()
        .map_err(|e| ClassifierError::Download(format!("Failed to create HF API: {}", e)))?;
    let repo = api.model(model_name.to_string());

    tracing::info!("Fetching {} from the Hugging Face Hub", model_name);

    let config_path = repo.get("config.json").map_err(|e| {
        ClassifierError::Download(format!("Failed to download {} config: {}", model_name, e))
    })?;

    let weights = match repo.get("model.safetensors") {
        Ok(path) => WeightsFile::Safetensors(path),
        Err(_) => repo
            .get("pytorch_model.bin")
            .map(WeightsFile::PyTorch)
            .map_err(|e| {
                ClassifierError::Download(format!(
                    "Failed to download {} weights: {}",
                    model_name, e
                ))
            })?,
    };

    let tokenizer = match repo.get("tokenizer.json") {
        Ok(path) => TokenizerFile::Json(path),
        Err(_) => {
            let path = repo.get("vocab.txt").map_err(|e| {
                ClassifierError::Download(format!(
                    "Failed to download {} vocabulary: {}",
                    model_name, e
                ))
            })?;
            let lowercase = match repo.get("tokenizer_config.json") {
                Ok(config) => lowercase_from_tokenizer_config(config)?,
                Err(_) => false,
            };
            TokenizerFile::Vocab { path, lowercase }
        }
    };

    Ok(HfModelFiles {
        config_path,
        weights,
        tokenizer,
    })
}

#[cfg(feature = "pretrained")]
impl TokenizerFile {
    pub fn load(&self) -> Result<BertTokenizer> {
        match self {
            TokenizerFile::Json(path) => BertTokenizer::from_file(path),
            TokenizerFile::Vocab { path, lowercase } => {
                BertTokenizer::from_vocab(path, *lowercase)
            }
        }
    }
}

#[cfg(feature = "pretrained")]
impl<B: Backend> BertModel<B> {
    /// Load a pre-trained BERT encoder by Hub identifier, e.g. [`DEFAULT_MODEL`].
    ///
    /// Downloads from HuggingFace Hub (cached after first download).
    /// Returns the model, its tokenizer and its configuration.
    pub fn pretrained(
        device: &B::Device,
        model_name: &str,
        cache_dir: Option<PathBuf>,
    ) -> Result<(Self, BertTokenizer, BertConfig)> {
        let files = download_hf_model(model_name, cache_dir)?;

        let config = load_config(&files.config_path)?;
        let mut model = config.init(device);

        load_pretrained(&mut model, &files.weights)?;

        let tokenizer = files.tokenizer.load()?;

        Ok((model, tokenizer, config))
    }
}
