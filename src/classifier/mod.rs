//! Cause classifier: a TF-IDF vectorizer feeding a dense model, decoded by a label
//! encoder. All three artifacts are fitted offline and loaded read-only at start.

pub mod label_encoder;
pub mod model;
pub mod vectorizer;

pub use label_encoder::LabelEncoder;
pub use model::{argmax, CauseNet, DenseModel, InferenceBackend};
pub use vectorizer::TfidfVectorizer;

use crate::app::ports::Predictor;
use crate::config::ArtifactPaths;
use crate::error::{AlertError, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Loads and cross-checks the three classifier artifacts.
pub struct ArtifactLoader;

impl ArtifactLoader {
    pub fn load(paths: &ArtifactPaths) -> Result<CausePredictor> {
        let model: DenseModel = read_artifact(&paths.model)?;
        model
            .validate()
            .map_err(|m| AlertError::artifact(paths.model.display().to_string(), m))?;

        let vectorizer: TfidfVectorizer = read_artifact(&paths.vectorizer)?;
        vectorizer
            .validate()
            .map_err(|m| AlertError::artifact(paths.vectorizer.display().to_string(), m))?;

        let encoder: LabelEncoder = read_artifact(&paths.label_encoder)?;

        let predictor = CausePredictor::new(vectorizer, model, encoder).map_err(|m| {
            AlertError::artifact(paths.model.display().to_string(), m)
        })?;
        info!(
            features = predictor.vectorizer.width(),
            classes = predictor.encoder.len(),
            "Loaded classifier artifacts"
        );
        Ok(predictor)
    }
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let shown = path.display().to_string();
    let bytes = fs::read(path).map_err(|e| AlertError::artifact(&shown, e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| AlertError::artifact(&shown, e.to_string()))
}

/// Predicts a cause label for an alert description.
#[derive(Debug)]
pub struct CausePredictor {
    vectorizer: TfidfVectorizer,
    // burn modules are Send but not Sync
    net: Mutex<CauseNet<InferenceBackend>>,
    encoder: LabelEncoder,
}

impl CausePredictor {
    /// Fails if the three artifacts disagree on feature or class counts.
    pub fn new(
        vectorizer: TfidfVectorizer,
        model: DenseModel,
        encoder: LabelEncoder,
    ) -> std::result::Result<Self, String> {
        model.validate()?;
        if model.input_width() != vectorizer.width() {
            return Err(format!(
                "model expects {} features but vectorizer produces {}",
                model.input_width(),
                vectorizer.width()
            ));
        }
        if model.output_width() != encoder.len() {
            return Err(format!(
                "model has {} outputs but label encoder has {} classes",
                model.output_width(),
                encoder.len()
            ));
        }
        let net = CauseNet::from_model(&model, &Default::default());
        Ok(Self {
            vectorizer,
            net: Mutex::new(net),
            encoder,
        })
    }

    pub fn predict(&self, description: &str) -> Result<String> {
        let features = self.vectorizer.transform(description)?;
        let probs = self
            .net
            .lock()
            .map_err(|_| AlertError::Prediction("classifier lock poisoned".to_string()))?
            .predict_proba(&features)?;
        let index = argmax(&probs)
            .ok_or_else(|| AlertError::Prediction("model produced no probabilities".to_string()))?;
        self.encoder
            .inverse_transform(index)
            .map(str::to_string)
            .ok_or_else(|| AlertError::Prediction(format!("class index {index} has no label")))
    }
}

impl Predictor for CausePredictor {
    fn predict(&self, description: &str) -> Result<String> {
        CausePredictor::predict(self, description)
    }
}
