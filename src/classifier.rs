//! Brightness classification of wallpaper features.
//!
//! The catalog never talks to a concrete model directly: the scanner only
//! needs something implementing [`Classifier`]. [`NeuralNet`] is the default
//! implementation, a small feed-forward network with two inputs
//! (kurtosis, lightness) and three outputs (night, twilight, day) whose
//! weights are read from a JSON file.
//!
//! ## Data File
//!
//! ```json
//! {
//!   "steepness": 1.0,
//!   "layers": [
//!     { "weights": [[0.0, -6.0], [0.0, 0.0], [0.0, 6.0]], "biases": [2.0, 0.0, -4.0] }
//!   ]
//! }
//! ```
//!
//! `weights[j][i]` connects input `i` to output `j` of a layer. Every layer
//! uses the symmetric sigmoid `tanh(steepness * (W·x + b))`, so activations
//! live in `[-1, 1]`. `steepness` may be left out and then defaults to 0.5.

use crate::brightness::Brightness;
use crate::features::Features;
use anyhow::{bail, Context, Result};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Number of network inputs: kurtosis and lightness.
pub const NUM_INPUTS: usize = 2;

/// Number of network outputs: one per brightness bucket.
pub const NUM_OUTPUTS: usize = 3;

/// Built-in network: night below lightness 1/3, day above 2/3.
pub const REFERENCE_NET: &str = include_str!("../data/brightness-net.json");

/// Anything that can put extracted features into a brightness bucket.
///
/// Implementations must be deterministic: the same features always give the
/// same bucket.
pub trait Classifier {
    /// Classify one wallpaper.
    ///
    /// # Errors
    ///
    /// Returns an error if the model produces no usable activation.
    fn classify(&self, features: Features) -> Result<Brightness>;
}

/// Pick the bucket with the largest activation.
///
/// Ties go to the lowest class index. `NaN` activations never win. Returns
/// `None` when there are not exactly three activations or none is a number.
#[must_use]
pub fn strongest_class(activations: &[f64]) -> Option<Brightness> {
    if activations.len() != NUM_OUTPUTS {
        return None;
    }

    let mut best: Option<(usize, f64)> = None;
    for (index, &value) in activations.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if value <= top => {}
            _ => best = Some((index, value)),
        }
    }

    best.and_then(|(index, _)| Brightness::from_index(index as i64))
}

/// One fully connected layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub weights: Vec<Vec<f64>>,
    pub biases: Vec<f64>,
}

impl Layer {
    fn inputs(&self) -> usize {
        self.weights.first().map_or(0, Vec::len)
    }

    fn outputs(&self) -> usize {
        self.weights.len()
    }

    fn forward(&self, input: &[f64], steepness: f64) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.biases)
            .map(|(row, bias)| {
                let sum: f64 = row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>() + bias;
                (steepness * sum).tanh()
            })
            .collect()
    }
}

fn default_steepness() -> f64 {
    0.5
}

/// Pretrained feed-forward network loaded from a JSON data file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuralNet {
    #[serde(default = "default_steepness")]
    pub steepness: f64,
    pub layers: Vec<Layer>,
}

impl NeuralNet {
    /// Read and validate a network data file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, is not valid JSON, or describes a
    /// network that is not 2-in/3-out with consistent layer sizes.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read classifier data from {}", path.display()))?;
        let net = Self::from_json(&raw)
            .with_context(|| format!("Invalid classifier data in {}", path.display()))?;
        debug!("Loaded brightness classifier with {} layers from {}", net.layers.len(), path.display());
        Ok(net)
    }

    /// Parse and validate a network from its JSON form.
    ///
    /// # Errors
    ///
    /// Same conditions as [`NeuralNet::load`], minus the file access.
    pub fn from_json(raw: &str) -> Result<Self> {
        let net: NeuralNet = serde_json::from_str(raw).context("Malformed classifier JSON")?;
        net.validate()?;
        Ok(net)
    }

    fn validate(&self) -> Result<()> {
        if self.layers.is_empty() {
            bail!("Classifier has no layers");
        }
        if !self.steepness.is_finite() {
            bail!("Classifier steepness must be a finite number");
        }

        let mut expected_inputs = NUM_INPUTS;
        for (n, layer) in self.layers.iter().enumerate() {
            if layer.outputs() == 0 {
                bail!("Layer {n} has no neurons");
            }
            if layer.biases.len() != layer.outputs() {
                bail!(
                    "Layer {n} has {} neurons but {} biases",
                    layer.outputs(),
                    layer.biases.len()
                );
            }
            if layer.weights.iter().any(|row| row.len() != expected_inputs) {
                bail!("Layer {n} expects {expected_inputs} inputs per neuron");
            }
            expected_inputs = layer.outputs();
        }

        if expected_inputs != NUM_OUTPUTS {
            bail!("Classifier must have {NUM_OUTPUTS} outputs, found {expected_inputs}");
        }
        Ok(())
    }

    /// Feed the inputs through every layer and return the output activations.
    #[must_use]
    pub fn run(&self, input: [f64; NUM_INPUTS]) -> Vec<f64> {
        let mut values = input.to_vec();
        for layer in &self.layers {
            debug_assert_eq!(layer.inputs(), values.len());
            values = layer.forward(&values, self.steepness);
        }
        values
    }
}

impl Classifier for NeuralNet {
    fn classify(&self, features: Features) -> Result<Brightness> {
        let out = self.run([features.kurtosis, features.lightness]);
        trace!("Activations {out:?} for {features:?}");
        match strongest_class(&out) {
            Some(class) => Ok(class),
            None => bail!("Classifier produced no usable activation for {features:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(lightness: f64) -> Features {
        Features { kurtosis: 0.0, lightness }
    }

    #[test]
    fn test_strongest_class_picks_maximum() {
        assert_eq!(strongest_class(&[-0.9, 0.2, 0.8]), Some(Brightness::Day));
        assert_eq!(strongest_class(&[0.1, 0.7, -0.3]), Some(Brightness::Twilight));
        assert_eq!(strongest_class(&[0.99, -1.0, -1.0]), Some(Brightness::Night));
    }

    #[test]
    fn test_strongest_class_tie_goes_to_lowest_index() {
        assert_eq!(strongest_class(&[0.5, 0.5, 0.1]), Some(Brightness::Night));
        assert_eq!(strongest_class(&[-0.2, 0.4, 0.4]), Some(Brightness::Twilight));
    }

    #[test]
    fn test_strongest_class_rejects_bad_input() {
        assert_eq!(strongest_class(&[0.1, 0.2]), None);
        assert_eq!(strongest_class(&[f64::NAN, f64::NAN, f64::NAN]), None);
        assert_eq!(strongest_class(&[f64::NAN, -0.5, -0.7]), Some(Brightness::Twilight));
    }

    #[test]
    fn test_reference_net_buckets() -> Result<()> {
        let net = NeuralNet::from_json(REFERENCE_NET)?;
        assert_eq!(net.classify(features(0.05))?, Brightness::Night);
        assert_eq!(net.classify(features(0.2))?, Brightness::Night);
        assert_eq!(net.classify(features(0.5))?, Brightness::Twilight);
        assert_eq!(net.classify(features(0.8))?, Brightness::Day);
        assert_eq!(net.classify(features(0.95))?, Brightness::Day);
        Ok(())
    }

    #[test]
    fn test_classification_is_deterministic() -> Result<()> {
        let net = NeuralNet::from_json(REFERENCE_NET)?;
        let f = Features { kurtosis: 1.3, lightness: 0.41 };
        assert_eq!(net.classify(f)?, net.classify(f)?);
        assert_eq!(net.run([1.3, 0.41]), net.run([1.3, 0.41]));
        Ok(())
    }

    #[test]
    fn test_hidden_layer_network() -> Result<()> {
        let raw = r#"{
            "layers": [
                { "weights": [[1.0, 0.0], [0.0, 1.0]], "biases": [0.0, 0.0] },
                { "weights": [[1.0, 0.0], [0.0, 0.0], [0.0, 1.0]], "biases": [0.0, 0.1, 0.0] }
            ]
        }"#;
        let net = NeuralNet::from_json(raw)?;
        assert_eq!(net.steepness, 0.5);
        assert_eq!(net.run([0.0, 0.0]).len(), NUM_OUTPUTS);
        assert_eq!(net.classify(Features { kurtosis: 0.0, lightness: 4.0 })?, Brightness::Day);
        Ok(())
    }

    #[test]
    fn test_invalid_networks_are_rejected() {
        assert!(NeuralNet::from_json("not json").is_err());
        assert!(NeuralNet::from_json(r#"{ "layers": [] }"#).is_err());
        // Three inputs.
        assert!(NeuralNet::from_json(
            r#"{ "layers": [{ "weights": [[1,2,3],[1,2,3],[1,2,3]], "biases": [0,0,0] }] }"#
        )
        .is_err());
        // Two outputs.
        assert!(NeuralNet::from_json(
            r#"{ "layers": [{ "weights": [[1,2],[1,2]], "biases": [0,0] }] }"#
        )
        .is_err());
        // Bias count mismatch.
        assert!(NeuralNet::from_json(
            r#"{ "layers": [{ "weights": [[1,2],[1,2],[1,2]], "biases": [0] }] }"#
        )
        .is_err());
    }

    #[test]
    fn test_steepness_defaults_to_half() -> Result<()> {
        let net = NeuralNet::from_json(
            r#"{ "layers": [ { "weights": [[0.0, -6.0], [0.0, 0.0], [0.0, 6.0]], "biases": [2.0, 0.0, -4.0] } ] }"#,
        )?;
        assert_eq!(net.steepness, 0.5);
        Ok(())
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = NeuralNet::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read classifier data"));
    }
}
