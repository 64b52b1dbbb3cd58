use std::fmt;

use serde::{Deserialize, Serialize};

use crate::param::{NamedParams, ParamValue};

/// One layer descriptor, in the order it will be stacked by the trainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerSpec {
    Convolution {
        kernel_size: usize,
        stride: usize,
        num_channels: usize,
        padding: usize,
        #[serde(default, skip_serializing_if = "NamedParams::is_empty")]
        params: NamedParams,
    },
    MaxPooling {
        kernel_size: usize,
        stride: usize,
        padding: usize,
        #[serde(default, skip_serializing_if = "NamedParams::is_empty")]
        params: NamedParams,
    },
    AvgPooling {
        kernel_size: usize,
        stride: usize,
        padding: usize,
        #[serde(default, skip_serializing_if = "NamedParams::is_empty")]
        params: NamedParams,
    },
    Flatten,
    FullConnection {
        num_hidden_units: usize,
        #[serde(default, skip_serializing_if = "NamedParams::is_empty")]
        params: NamedParams,
    },
    Relu,
    Sigmoid,
    Tanh,
    SoftMax,
    Dropout {
        threshold: f64,
        #[serde(default, skip_serializing_if = "NamedParams::is_empty")]
        params: NamedParams,
    },
}

impl LayerSpec {
    /// The layer's short name, as used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Convolution { .. } => "convolution",
            Self::MaxPooling { .. } => "max_pooling",
            Self::AvgPooling { .. } => "avg_pooling",
            Self::Flatten => "flatten",
            Self::FullConnection { .. } => "full_connection",
            Self::Relu => "relu",
            Self::Sigmoid => "sigmoid",
            Self::Tanh => "tanh",
            Self::SoftMax => "soft_max",
            Self::Dropout { .. } => "dropout",
        }
    }

    /// Whether the layer keeps the spatial (channel, height, width) shape of its input.
    pub fn is_spatial(&self) -> bool {
        matches!(
            self,
            Self::Convolution { .. } | Self::MaxPooling { .. } | Self::AvgPooling { .. }
        )
    }

    /// Whether the layer produces a flat vector.
    pub fn is_flat(&self) -> bool {
        matches!(self, Self::Flatten | Self::FullConnection { .. })
    }

    /// The extra named parameters of the layer, if it takes any.
    pub fn params(&self) -> Option<&NamedParams> {
        match self {
            Self::Convolution { params, .. }
            | Self::MaxPooling { params, .. }
            | Self::AvgPooling { params, .. }
            | Self::FullConnection { params, .. }
            | Self::Dropout { params, .. } => Some(params),
            _ => None,
        }
    }
}

impl fmt::Display for LayerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Convolution {
                kernel_size,
                stride,
                num_channels,
                padding,
                ..
            } => write!(
                f,
                "ConvolutionLayer(kernel_size={kernel_size}, stride={stride}, \
                 num_channels={num_channels}, padding={padding}"
            )?,
            Self::MaxPooling {
                kernel_size,
                stride,
                padding,
                ..
            } => write!(
                f,
                "MaxPoolingLayer(kernel_size={kernel_size}, stride={stride}, padding={padding}"
            )?,
            Self::AvgPooling {
                kernel_size,
                stride,
                padding,
                ..
            } => write!(
                f,
                "AveragePoolingLayer(kernel_size={kernel_size}, stride={stride}, padding={padding}"
            )?,
            Self::Flatten => return write!(f, "FlattenLayer()"),
            Self::FullConnection {
                num_hidden_units, ..
            } => write!(f, "FullConnectionLayer(num_hidden_units={num_hidden_units}")?,
            Self::Relu => return write!(f, "RectifiedLinearLayer()"),
            Self::Sigmoid => return write!(f, "SigmoidLayer()"),
            Self::Tanh => return write!(f, "TanhLayer()"),
            Self::SoftMax => return write!(f, "SoftmaxLayer()"),
            Self::Dropout { threshold, .. } => write!(f, "DropoutLayer(threshold={threshold}")?,
        }

        if let Some(params) = self.params() {
            for (name, value) in params {
                write!(f, ", {name}={value}")?;
            }
        }
        write!(f, ")")
    }
}

/// Arguments for a convolution layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Convolution {
    kernel_size: usize,
    stride: usize,
    num_channels: usize,
    padding: usize,
    params: NamedParams,
}

impl Convolution {
    /// Creates a convolution layer with no padding.
    ///
    /// # Arguments
    /// * `kernel_size` - Side of the square filter.
    /// * `stride` - Step between filter applications.
    /// * `num_channels` - Number of output channels (filters).
    pub fn new(kernel_size: usize, stride: usize, num_channels: usize) -> Self {
        Self {
            kernel_size,
            stride,
            num_channels,
            padding: 0,
            params: NamedParams::new(),
        }
    }

    pub fn padding(mut self, padding: usize) -> Self {
        self.padding = padding;
        self
    }

    /// Adds a trainer specific option (e.g. `init_random`) to the layer.
    pub fn param(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }
}

impl From<Convolution> for LayerSpec {
    fn from(c: Convolution) -> Self {
        LayerSpec::Convolution {
            kernel_size: c.kernel_size,
            stride: c.stride,
            num_channels: c.num_channels,
            padding: c.padding,
            params: c.params,
        }
    }
}

/// Arguments shared by the max and average pooling layers.
#[derive(Debug, Clone, PartialEq)]
pub struct Pooling {
    kernel_size: usize,
    stride: usize,
    padding: usize,
    params: NamedParams,
}

impl Pooling {
    /// Creates a pooling layer with a stride of one and no padding.
    pub fn new(kernel_size: usize) -> Self {
        Self {
            kernel_size,
            stride: 1,
            padding: 0,
            params: NamedParams::new(),
        }
    }

    pub fn stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    pub fn padding(mut self, padding: usize) -> Self {
        self.padding = padding;
        self
    }

    pub fn param(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    pub(crate) fn into_max(self) -> LayerSpec {
        LayerSpec::MaxPooling {
            kernel_size: self.kernel_size,
            stride: self.stride,
            padding: self.padding,
            params: self.params,
        }
    }

    pub(crate) fn into_avg(self) -> LayerSpec {
        LayerSpec::AvgPooling {
            kernel_size: self.kernel_size,
            stride: self.stride,
            padding: self.padding,
            params: self.params,
        }
    }
}

/// Arguments for a fully connected layer.
#[derive(Debug, Clone, PartialEq)]
pub struct FullConnection {
    num_hidden_units: usize,
    params: NamedParams,
}

impl FullConnection {
    pub fn new(num_hidden_units: usize) -> Self {
        Self {
            num_hidden_units,
            params: NamedParams::new(),
        }
    }

    /// Adds a trainer specific option such as `init_sigma` or `init_bias`.
    pub fn param(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }
}

impl From<FullConnection> for LayerSpec {
    fn from(fc: FullConnection) -> Self {
        LayerSpec::FullConnection {
            num_hidden_units: fc.num_hidden_units,
            params: fc.params,
        }
    }
}

/// Arguments for a dropout layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Dropout {
    threshold: f64,
    params: NamedParams,
}

impl Dropout {
    pub const DEFAULT_THRESHOLD: f64 = 0.5;

    /// Creates a dropout layer that zeroes activations with probability `threshold`.
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            params: NamedParams::new(),
        }
    }

    pub fn param(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }
}

impl Default for Dropout {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD)
    }
}

impl From<Dropout> for LayerSpec {
    fn from(d: Dropout) -> Self {
        LayerSpec::Dropout {
            threshold: d.threshold,
            params: d.params,
        }
    }
}
