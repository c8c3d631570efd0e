//! Q-value network using tch-rs (PyTorch bindings).
//!
//! This module is only available with the `rl-nn` feature.

use std::collections::BTreeMap;

use tch::{nn, nn::Module, Device, Kind, Tensor};

use super::checkpoint::{CheckpointError, NamedTensor};

/// MLP mapping an encoded state to one value per action.
///
/// Architecture: `state_dim → hidden → action_dim` with a ReLU between.
pub struct QNetwork {
    vs: nn::VarStore,
    net: nn::Sequential,
}

impl QNetwork {
    pub fn new(state_dim: usize, hidden: i64, action_dim: usize, device: Device) -> Self {
        let vs = nn::VarStore::new(device);
        let p = &vs.root();
        let net = nn::seq()
            .add(nn::linear(
                p / "fc1",
                state_dim as i64,
                hidden,
                Default::default(),
            ))
            .add_fn(|x| x.relu())
            .add(nn::linear(
                p / "fc2",
                hidden,
                action_dim as i64,
                Default::default(),
            ));

        Self { vs, net }
    }

    /// Forward pass over a `[batch, state_dim]` float tensor.
    pub fn forward(&self, states: &Tensor) -> Tensor {
        self.net.forward(states)
    }

    pub fn device(&self) -> Device {
        self.vs.device()
    }

    pub fn var_store(&self) -> &nn::VarStore {
        &self.vs
    }

    pub fn var_store_mut(&mut self) -> &mut nn::VarStore {
        &mut self.vs
    }

    /// Overwrites this network's parameters with `other`'s.
    pub fn copy_from(&mut self, other: &QNetwork) -> Result<(), CheckpointError> {
        self.vs.copy(&other.vs)?;
        Ok(())
    }

    /// Flattens every parameter, sorted by name.
    pub fn export(&self) -> Result<Vec<NamedTensor>, CheckpointError> {
        let vars: BTreeMap<String, Tensor> = self.vs.variables().into_iter().collect();
        let mut out = Vec::with_capacity(vars.len());
        for (name, var) in vars {
            let flat = var
                .detach()
                .to_device(Device::Cpu)
                .to_kind(Kind::Float)
                .flatten(0, -1);
            out.push(NamedTensor {
                name,
                shape: var.size(),
                data: Vec::<f32>::try_from(&flat)?,
            });
        }
        Ok(out)
    }

    /// Checks that `params` names exactly this network's parameters with
    /// matching shapes and data lengths.
    pub fn validate(&self, params: &[NamedTensor]) -> Result<(), CheckpointError> {
        let vars = self.vs.variables();
        for (name, var) in &vars {
            let Some(param) = params.iter().find(|p| &p.name == name) else {
                return Err(CheckpointError::MissingParameter(name.clone()));
            };
            let expected = var.size();
            let numel: i64 = expected.iter().product();
            if param.shape != expected || param.data.len() as i64 != numel {
                return Err(CheckpointError::ShapeMismatch {
                    what: name.clone(),
                    expected,
                    found: param.shape.clone(),
                });
            }
        }
        if let Some(extra) = params.iter().find(|p| !vars.contains_key(&p.name)) {
            return Err(CheckpointError::ShapeMismatch {
                what: format!("unknown parameter '{}'", extra.name),
                expected: Vec::new(),
                found: extra.shape.clone(),
            });
        }
        Ok(())
    }

    /// Loads `params` into this network. Call [`QNetwork::validate`] first;
    /// nothing here checks shapes before writing.
    pub fn import(&mut self, params: &[NamedTensor]) {
        let device = self.device();
        let mut vars = self.vs.variables();
        tch::no_grad(|| {
            for param in params {
                if let Some(var) = vars.get_mut(&param.name) {
                    let src = Tensor::from_slice(&param.data)
                        .reshape(param.shape.as_slice())
                        .to_device(device);
                    var.copy_(&src);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_shape() {
        let net = QNetwork::new(9, 16, 5, Device::Cpu);
        let out = net.forward(&Tensor::zeros([3, 9], (Kind::Float, Device::Cpu)));
        assert_eq!(out.size(), vec![3, 5]);
    }

    #[test]
    fn export_import_copies_parameters() {
        let a = QNetwork::new(9, 16, 5, Device::Cpu);
        let mut b = QNetwork::new(9, 16, 5, Device::Cpu);
        let params = a.export().unwrap();
        assert_eq!(params.len(), 4);
        b.validate(&params).unwrap();
        b.import(&params);
        assert_eq!(b.export().unwrap(), params);
    }

    #[test]
    fn validate_rejects_wrong_shape() {
        let small = QNetwork::new(9, 8, 5, Device::Cpu);
        let net = QNetwork::new(9, 16, 5, Device::Cpu);
        let err = net.validate(&small.export().unwrap()).unwrap_err();
        assert!(matches!(err, CheckpointError::ShapeMismatch { .. }));
    }
}
