//! Assembles neural network topologies for an external graph based trainer.
//!
//! The builder only describes the network: it appends layer descriptors,
//! keeps a map of training hyperparameters and validates both before handing
//! them off as a [`NetSpec`].

pub mod builder;
pub mod error;
pub mod layers;
pub mod param;
pub mod spec;
mod validate;

pub use builder::NetBuilder;
pub use error::{BuilderErr, Result};
pub use layers::{Convolution, Dropout, FullConnection, LayerSpec, Pooling};
pub use param::{NamedParams, ParamValue};
pub use spec::NetSpec;
