//! A stack of layers closed by a loss

use crate::ann::{Initialization, Layer, Loss};
use crate::core::error::check_dim;
use crate::core::{Matrix, MlError, Result, Vector};
use log::debug;
use ndarray::{Array1, ArrayView2};
use rand::Rng;

/// Layers applied in insertion order. The flat parameter vector is the
/// concatenation of every layer's buffer in the same order.
#[derive(Debug)]
pub struct Sequential<L: Loss> {
    layers: Vec<Box<dyn Layer>>,
    loss: L,
}

impl<L: Loss> Sequential<L> {
    pub fn new(loss: L) -> Self {
        Self {
            layers: Vec::new(),
            loss,
        }
    }

    pub fn add<T: Layer + 'static>(&mut self, layer: T) {
        self.layers.push(Box::new(layer));
    }

    pub fn with_layer<T: Layer + 'static>(mut self, layer: T) -> Self {
        self.add(layer);
        self
    }

    pub fn layers(&self) -> &[Box<dyn Layer>] {
        &self.layers
    }

    pub fn loss(&self) -> &L {
        &self.loss
    }

    pub fn weight_size(&self) -> usize {
        self.layers.iter().map(|l| l.weight_size()).sum()
    }

    pub fn parameters(&self) -> Vector {
        self.layers
            .iter()
            .flat_map(|l| l.parameters().iter().copied())
            .collect::<Array1<f64>>()
    }

    pub fn set_parameters(&mut self, parameters: &[f64]) -> Result<()> {
        check_dim(self.weight_size(), parameters.len())?;
        let mut offset = 0;
        for layer in &mut self.layers {
            let size = layer.weight_size();
            layer.set_weights(&parameters[offset..offset + size])?;
            offset += size;
        }
        Ok(())
    }

    /// Fill every layer's parameters using its own fan-in and fan-out
    pub fn initialize<R: Rng + ?Sized>(&mut self, init: Initialization, rng: &mut R) -> Result<()> {
        for layer in &mut self.layers {
            let weights =
                init.generate(layer.weight_size(), layer.input_size(), layer.output_size(), rng)?;
            layer.set_weights(&weights)?;
        }
        debug!(
            "Initialized {} parameters across {} layers",
            self.weight_size(),
            self.layers.len()
        );
        Ok(())
    }

    pub fn forward(&self, input: ArrayView2<'_, f64>) -> Result<Matrix> {
        let mut activations = self.forward_all(input)?;
        activations.pop().ok_or(MlError::ModelNotTrained)
    }

    /// Loss of the network output on `input` against `target`
    pub fn evaluate(&self, input: ArrayView2<'_, f64>, target: ArrayView2<'_, f64>) -> Result<f64> {
        let output = self.forward(input)?;
        self.loss.forward(output.view(), target)
    }

    /// Loss and flat parameter gradient
    pub fn gradient(
        &self,
        input: ArrayView2<'_, f64>,
        target: ArrayView2<'_, f64>,
    ) -> Result<(f64, Vector)> {
        let activations = self.forward_all(input)?;
        let output = activations[activations.len() - 1].view();
        let loss = self.loss.forward(output, target)?;
        let mut error = self.loss.backward(output, target)?;

        let mut gradients = Vec::with_capacity(self.layers.len());
        for (i, layer) in self.layers.iter().enumerate().rev() {
            gradients.push(layer.gradient(activations[i].view(), error.view())?);
            if i > 0 {
                error = layer.backward(
                    activations[i].view(),
                    activations[i + 1].view(),
                    error.view(),
                )?;
            }
        }

        let gradient = gradients
            .iter()
            .rev()
            .flat_map(|g| g.iter().copied())
            .collect::<Array1<f64>>();
        Ok((loss, gradient))
    }

    /// The input followed by every layer's output
    fn forward_all(&self, input: ArrayView2<'_, f64>) -> Result<Vec<Matrix>> {
        if self.layers.is_empty() {
            return Err(MlError::InvalidParameter(
                "network has no layers".to_string(),
            ));
        }
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(input.to_owned());
        for layer in &self.layers {
            let next = layer.forward(activations[activations.len() - 1].view())?;
            activations.push(next);
        }
        Ok(activations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ann::{Linear, LogSoftMax, MeanSquaredError, NegativeLogLikelihood};
    use approx::assert_relative_eq;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_parameters_round_trip() {
        let mut net = Sequential::new(MeanSquaredError)
            .with_layer(Linear::new(2, 3))
            .with_layer(Linear::new(3, 1));
        assert_eq!(net.weight_size(), 9 + 4);

        let params: Vec<f64> = (0..13).map(f64::from).collect();
        net.set_parameters(&params).unwrap();
        assert_eq!(net.parameters().to_vec(), params);
        assert_eq!(net.layers()[1].parameters(), &params[9..]);
        assert!(net.set_parameters(&params[1..]).is_err());
    }

    #[test]
    fn test_empty_network() {
        let net = Sequential::new(MeanSquaredError);
        assert!(net.forward(array![[1.0]].view()).is_err());
    }

    #[test]
    fn test_gradient_matches_finite_differences() {
        let mut net = Sequential::new(NegativeLogLikelihood)
            .with_layer(Linear::new(3, 4))
            .with_layer(Linear::new(4, 3))
            .with_layer(LogSoftMax::new(3));
        let mut rng = StdRng::seed_from_u64(5);
        net.initialize(Initialization::XavierUniform, &mut rng).unwrap();

        let input = array![[0.5, -1.0], [1.5, 0.0], [-0.3, 2.0]];
        let target = array![[2.0, 0.0]];
        let (loss, gradient) = net.gradient(input.view(), target.view()).unwrap();
        assert_relative_eq!(
            loss,
            net.evaluate(input.view(), target.view()).unwrap(),
            epsilon = 1e-12
        );

        let base = net.parameters().to_vec();
        let h = 1e-6;
        for i in 0..base.len() {
            let mut p = base.clone();
            p[i] += h;
            net.set_parameters(&p).unwrap();
            let up = net.evaluate(input.view(), target.view()).unwrap();
            p[i] -= 2.0 * h;
            net.set_parameters(&p).unwrap();
            let down = net.evaluate(input.view(), target.view()).unwrap();
            assert_relative_eq!(gradient[i], (up - down) / (2.0 * h), epsilon = 1e-6);
        }
    }
}
