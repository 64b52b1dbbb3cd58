use std::{fmt, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{error::Result, layers::LayerSpec, param::NamedParams, validate::validate};

/// A validated network description, ready for the external trainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetSpec {
    pub layers: Vec<LayerSpec>,
    #[serde(default)]
    pub params: NamedParams,
}

impl NetSpec {
    /// Encodes the network as JSON.
    ///
    /// # Errors
    /// Returns `BuilderErr::Json` if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decodes and validates a network from JSON.
    ///
    /// # Errors
    /// Returns `BuilderErr::Json` on malformed input or a validation error
    /// if the decoded network could not have been built.
    pub fn from_json(json: &str) -> Result<Self> {
        let spec: Self = serde_json::from_str(json)?;
        validate(&spec.layers, &spec.params)?;
        Ok(spec)
    }

    /// Writes the network as JSON to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)?;
        log::info!(layers = self.layers.len(); "saved network to {}", path.display());
        Ok(())
    }

    /// Reads a network previously written with [`NetSpec::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

impl fmt::Display for NetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "### network layers ###")?;
        for (i, layer) in self.layers.iter().enumerate() {
            writeln!(f, "layer[{i}]: {layer}")?;
        }

        writeln!(f, "### end network layers ###")?;
        writeln!(f, "### network parameters ###")?;
        for (name, value) in &self.params {
            writeln!(f, "{name} = {value}")?;
        }
        write!(f, "### end network parameters ###")
    }
}
