use crate::{
    error::{BuilderErr, Result},
    layers::LayerSpec,
    param::{NamedParams, ParamValue},
};

/// Checks that a layer stack and its hyperparameters can be handed to the trainer.
///
/// # Arguments
/// * `layers` - The layers, in stacking order.
/// * `params` - The net level hyperparameters.
///
/// # Errors
/// Returns the first problem found, layers are checked before parameters.
pub fn validate(layers: &[LayerSpec], params: &NamedParams) -> Result<()> {
    if layers.is_empty() {
        return Err(BuilderErr::EmptyNet);
    }

    for (i, layer) in layers.iter().enumerate() {
        validate_layer(i, layer)?;
    }

    validate_topology(layers)?;

    for (name, value) in params {
        validate_param(name, value)?;
    }

    Ok(())
}

fn invalid_layer(index: usize, layer: &LayerSpec, msg: String) -> BuilderErr {
    BuilderErr::InvalidLayer {
        index,
        layer: layer.name(),
        msg,
    }
}

fn validate_layer(i: usize, layer: &LayerSpec) -> Result<()> {
    let positive = |value: usize, what: &str| {
        if value == 0 {
            return Err(invalid_layer(i, layer, format!("{what} must be greater than 0")));
        }
        Ok(())
    };

    match *layer {
        LayerSpec::Convolution {
            kernel_size,
            stride,
            num_channels,
            ..
        } => {
            positive(kernel_size, "kernel_size")?;
            positive(stride, "stride")?;
            positive(num_channels, "num_channels")?;
        }
        LayerSpec::MaxPooling {
            kernel_size,
            stride,
            padding,
            ..
        }
        | LayerSpec::AvgPooling {
            kernel_size,
            stride,
            padding,
            ..
        } => {
            positive(kernel_size, "kernel_size")?;
            positive(stride, "stride")?;
            if padding >= kernel_size {
                return Err(invalid_layer(
                    i,
                    layer,
                    format!("padding ({padding}) must be smaller than kernel_size ({kernel_size})"),
                ));
            }
        }
        LayerSpec::FullConnection {
            num_hidden_units, ..
        } => positive(num_hidden_units, "num_hidden_units")?,
        LayerSpec::Dropout { threshold, .. } => {
            if !(0.0..1.0).contains(&threshold) {
                return Err(invalid_layer(
                    i,
                    layer,
                    format!("threshold must be in [0, 1), got {threshold}"),
                ));
            }
        }
        LayerSpec::Flatten
        | LayerSpec::Relu
        | LayerSpec::Sigmoid
        | LayerSpec::Tanh
        | LayerSpec::SoftMax => {}
    }

    // JSON has no NaN or infinity, such a net could not be loaded back.
    let non_finite = layer
        .params()
        .into_iter()
        .flatten()
        .find(|(_, value)| matches!(value, ParamValue::Float(v) if !v.is_finite()));
    if let Some((name, value)) = non_finite {
        return Err(invalid_layer(i, layer, format!("param {name} must be finite, got {value}")));
    }

    Ok(())
}

#[derive(Clone, Copy, PartialEq)]
enum Shape {
    Input,
    Spatial,
    Flat,
}

fn validate_topology(layers: &[LayerSpec]) -> Result<()> {
    // Nothing is known about the input, so the first layer may be of any kind.
    let mut shape = Shape::Input;

    for (i, layer) in layers.iter().enumerate() {
        if layer.is_spatial() && shape == Shape::Flat {
            return Err(BuilderErr::InvalidTopology {
                index: i,
                msg: format!("{} layer cannot follow a flattened layer", layer.name()),
            });
        }

        if matches!(layer, LayerSpec::FullConnection { .. }) && shape == Shape::Spatial {
            return Err(BuilderErr::InvalidTopology {
                index: i,
                msg: "full_connection layer needs a flatten layer after spatial layers".into(),
            });
        }

        if layer.is_spatial() {
            shape = Shape::Spatial;
        } else if layer.is_flat() {
            shape = Shape::Flat;
        }
    }

    Ok(())
}

fn validate_param(name: &str, value: &ParamValue) -> Result<()> {
    let invalid = |msg: String| BuilderErr::InvalidParam {
        name: name.to_string(),
        msg,
    };

    let number = || {
        value
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| invalid(format!("expected a number, got {value}")))
    };

    if matches!(value, ParamValue::Float(v) if !v.is_finite()) {
        return Err(invalid(format!("must be finite, got {value}")));
    }

    match name {
        "learning_rate" => {
            let lr = number()?;
            if lr <= 0.0 {
                return Err(invalid(format!("must be greater than 0, got {lr}")));
            }
        }
        "momentum" => {
            let mu = number()?;
            if !(0.0..=1.0).contains(&mu) {
                return Err(invalid(format!("must be in [0, 1], got {mu}")));
            }
        }
        "l2_regularization" => {
            let l2 = number()?;
            if l2 < 0.0 {
                return Err(invalid(format!("must not be negative, got {l2}")));
            }
        }
        "batch_size" | "max_iterations" => match value.as_i64() {
            Some(n) if n > 0 => {}
            _ => return Err(invalid(format!("expected a positive integer, got {value}"))),
        },
        "metric" => {
            if value.as_str().is_none() {
                return Err(invalid(format!("expected a string, got {value}")));
            }
        }
        _ => log::debug!(param = name; "passing unknown param through"),
    }

    Ok(())
}
