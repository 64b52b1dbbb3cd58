use std::ops::Index;

use crate::{
    error::Result,
    layers::{Convolution, Dropout, FullConnection, LayerSpec, Pooling},
    param::{NamedParams, ParamValue},
    spec::NetSpec,
    validate::validate,
};

/// Accumulates layer descriptors and training hyperparameters for the external trainer.
///
/// Layers are stacked in the order they are added. Nothing is checked until
/// [`NetBuilder::get_net`] is called.
#[derive(Debug, Clone, Default)]
pub struct NetBuilder {
    layers: Vec<LayerSpec>,
    params: NamedParams,
}

impl NetBuilder {
    /// Creates a builder with no layers and no parameters.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, layer: LayerSpec) -> &mut Self {
        log::debug!(index = self.layers.len(); "adding {layer}");
        self.layers.push(layer);
        self
    }

    /// Appends a convolution layer.
    ///
    /// # Arguments
    /// * `conv` - The layer's arguments, see [`Convolution::new`].
    pub fn add_convolution_layer(&mut self, conv: Convolution) -> &mut Self {
        self.push(conv.into())
    }

    /// Appends a max pooling layer.
    pub fn add_max_pooling_layer(&mut self, pooling: Pooling) -> &mut Self {
        self.push(pooling.into_max())
    }

    /// Appends an average pooling layer.
    pub fn add_avg_pooling_layer(&mut self, pooling: Pooling) -> &mut Self {
        self.push(pooling.into_avg())
    }

    /// Appends a layer that flattens the spatial input into a vector.
    pub fn add_flatten_layer(&mut self) -> &mut Self {
        self.push(LayerSpec::Flatten)
    }

    /// Appends a fully connected layer.
    pub fn add_full_connection_layer(&mut self, fc: FullConnection) -> &mut Self {
        self.push(fc.into())
    }

    pub fn add_relu_layer(&mut self) -> &mut Self {
        self.push(LayerSpec::Relu)
    }

    pub fn add_sigmoid_layer(&mut self) -> &mut Self {
        self.push(LayerSpec::Sigmoid)
    }

    pub fn add_tanh_layer(&mut self) -> &mut Self {
        self.push(LayerSpec::Tanh)
    }

    pub fn add_soft_max_layer(&mut self) -> &mut Self {
        self.push(LayerSpec::SoftMax)
    }

    /// Appends a dropout layer, use `Dropout::default()` for the usual 0.5 threshold.
    pub fn add_dropout_layer(&mut self, dropout: Dropout) -> &mut Self {
        self.push(dropout.into())
    }

    /// Sets a training hyperparameter, replacing any previous value.
    ///
    /// # Returns
    /// The previous value, if there was one.
    pub fn set_param(&mut self, name: &str, value: impl Into<ParamValue>) -> Option<ParamValue> {
        self.params.insert(name.to_string(), value.into())
    }

    /// Returns a training hyperparameter.
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    pub fn remove_param(&mut self, name: &str) -> Option<ParamValue> {
        self.params.remove(name)
    }

    pub fn params(&self) -> &NamedParams {
        &self.params
    }

    pub fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Drops every layer, parameters are kept.
    pub fn clear(&mut self) {
        self.layers.clear();
    }

    /// Validates the accumulated layers and parameters and returns the network.
    ///
    /// # Returns
    /// A `NetSpec` holding a copy of the layers and parameters, the builder is
    /// left untouched so it can keep growing.
    ///
    /// # Errors
    /// Returns `BuilderErr::EmptyNet` if no layer was added, or the first
    /// layer, topology or parameter problem found.
    pub fn get_net(&self) -> Result<NetSpec> {
        validate(&self.layers, &self.params)?;

        let net = NetSpec {
            layers: self.layers.clone(),
            params: self.params.clone(),
        };
        log::info!(layers = net.layers.len(), params = net.params.len(); "network assembled");
        Ok(net)
    }
}

/// Looks up a training hyperparameter.
///
/// # Panics
/// Panics if the parameter was never set, use [`NetBuilder::param`] otherwise.
impl Index<&str> for NetBuilder {
    type Output = ParamValue;

    fn index(&self, name: &str) -> &Self::Output {
        match self.params.get(name) {
            Some(value) => value,
            None => panic!("no param named '{name}'"),
        }
    }
}
