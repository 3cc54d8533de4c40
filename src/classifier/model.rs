use crate::error::{AlertError, Result};
use burn::module::Param;
use burn::nn;
use burn::tensor::activation;
use burn::tensor::{backend::Backend, Shape as BurnShape, Tensor, TensorData};
use burn_ndarray::NdArray;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Linear,
    Relu,
    Sigmoid,
    Tanh,
    Softmax,
}

/// One fully connected layer. `weights` is laid out `[input][output]`.
#[derive(Debug, Clone, Deserialize)]
pub struct DenseLayer {
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
    pub activation: Activation,
}

impl DenseLayer {
    pub fn input_width(&self) -> usize {
        self.weights.len()
    }

    pub fn output_width(&self) -> usize {
        self.bias.len()
    }
}

/// A dense feed-forward classifier exported from the training notebook.
#[derive(Debug, Clone, Deserialize)]
pub struct DenseModel {
    pub layers: Vec<DenseLayer>,
}

impl DenseModel {
    pub fn input_width(&self) -> usize {
        self.layers.first().map(DenseLayer::input_width).unwrap_or(0)
    }

    pub fn output_width(&self) -> usize {
        self.layers.last().map(DenseLayer::output_width).unwrap_or(0)
    }

    /// Checks every layer is rectangular and consecutive layers line up.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.layers.is_empty() {
            return Err("model has no layers".to_string());
        }
        let mut expected_input = self.input_width();
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.input_width() != expected_input {
                return Err(format!(
                    "layer {i} expects {} inputs but receives {expected_input}",
                    layer.input_width()
                ));
            }
            if let Some(row) = layer.weights.iter().position(|r| r.len() != layer.output_width()) {
                return Err(format!(
                    "layer {i} weight row {row} has {} columns, bias has {}",
                    layer.weights[row].len(),
                    layer.output_width()
                ));
            }
            expected_input = layer.output_width();
        }
        Ok(())
    }
}

/// Backend the classifier runs on.
pub type InferenceBackend = NdArray<f32>;

/// The exported model rebuilt as burn `Linear` layers, each followed by its activation.
#[derive(Debug)]
pub struct CauseNet<B: Backend> {
    layers: Vec<(nn::Linear<B>, Activation)>,
    device: B::Device,
}

impl<B: Backend> CauseNet<B> {
    /// Loads the exported weights into `Linear` layers. Expects a validated model.
    pub fn from_model(model: &DenseModel, device: &B::Device) -> Self {
        let layers = model
            .layers
            .iter()
            .map(|layer| (linear_from(layer, device), layer.activation))
            .collect();
        Self {
            layers,
            device: device.clone(),
        }
    }

    pub fn input_width(&self) -> usize {
        self.layers
            .first()
            .map(|(linear, _)| linear.weight.dims()[0])
            .unwrap_or(0)
    }

    /// Class probabilities for one feature row.
    pub fn predict_proba(&self, features: &[f32]) -> Result<Vec<f32>> {
        if features.len() != self.input_width() {
            return Err(AlertError::Prediction(format!(
                "expected {} features, got {}",
                self.input_width(),
                features.len()
            )));
        }
        let data = TensorData::new(features.to_vec(), BurnShape::new([1, features.len()]));
        let mut x = Tensor::<B, 2>::from_data(data, &self.device);
        for (linear, act) in &self.layers {
            x = linear.forward(x);
            x = match act {
                Activation::Linear => x,
                Activation::Relu => activation::relu(x),
                Activation::Sigmoid => activation::sigmoid(x),
                Activation::Tanh => activation::tanh(x),
                Activation::Softmax => activation::softmax(x, 1),
            };
        }
        if self.layers.last().map(|(_, act)| *act) != Some(Activation::Softmax) {
            x = activation::softmax(x, 1);
        }
        let probs = x.into_data();
        probs
            .as_slice::<f32>()
            .map(<[f32]>::to_vec)
            .map_err(|e| AlertError::Prediction(format!("{e:?}")))
    }
}

fn linear_from<B: Backend>(layer: &DenseLayer, device: &B::Device) -> nn::Linear<B> {
    let (d_in, d_out) = (layer.input_width(), layer.output_width());
    let weights: Vec<f32> = layer.weights.iter().flatten().copied().collect();

    // burn stores Linear weights as [d_input, d_output], same as the export
    let mut linear = nn::LinearConfig::new(d_in, d_out).init(device);
    linear.weight = Param::from_tensor(Tensor::<B, 2>::from_data(
        TensorData::new(weights, BurnShape::new([d_in, d_out])),
        device,
    ));
    linear.bias = Some(Param::from_tensor(Tensor::<B, 1>::from_data(
        TensorData::new(layer.bias.clone(), BurnShape::new([d_out])),
        device,
    )));
    linear
}

/// Index of the largest probability; the first index wins a tie.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ if v.is_nan() => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
