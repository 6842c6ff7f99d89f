//! Client state and protocol handler for a local model.
//!
//! [`LocalClient`] owns the model and its three datasets for the life of the
//! process. Every request runs to completion on the calling thread; there is
//! no phase tracking between requests, the model's numbers are the only state.

use log::{debug, info};

use crate::error::{Error, Result};
use crate::parameter::{DOUBLE_TENSOR_TYPE, Parameters};
use crate::tensor::{decode_array, decode_scalar, encode_array, encode_scalar};
use crate::trait_def::{Client, Model};
use crate::typing::*;

/// Metrics key under which `evaluate` reports the model's metric.
pub const EVALUATE_METRIC_KEY: &str = "loss";

/// Training, validation and test data held by a client.
#[derive(Clone, Debug)]
pub struct Datasets<D> {
    pub training: D,
    pub validation: D,
    pub test: D,
}

pub struct LocalClient<M: Model> {
    model: M,
    datasets: Datasets<M::Dataset>,
}

impl<M: Model> LocalClient<M> {
    pub fn new(model: M, datasets: Datasets<M::Dataset>) -> Self {
        Self { model, datasets }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn datasets(&self) -> &Datasets<M::Dataset> {
        &self.datasets
    }

    pub fn into_parts(self) -> (M, Datasets<M::Dataset>) {
        (self.model, self.datasets)
    }

    /// Encodes the current weights (tensor 0) and bias (tensor 1).
    pub fn parameters(&self) -> Parameters {
        Parameters::new(
            vec![
                encode_array(&self.model.weights()),
                encode_scalar(self.model.bias()),
            ],
            DOUBLE_TENSOR_TYPE,
        )
    }

    /// Installs tensor 0 as the weights and, if present, tensor 1 as the bias.
    ///
    /// Empty parameters leave the model untouched. Both tensors are decoded
    /// before anything is written, so a malformed bias does not leave new
    /// weights behind.
    pub fn set_parameters(&mut self, parameters: &Parameters) -> Result<()> {
        let tensors = parameters.tensors();
        debug!(tensors = tensors.len(); "received parameters");

        let Some(weights) = tensors.first() else {
            return Ok(());
        };
        let weights = decode_array::<f64>(weights)?;
        let bias = tensors.get(1).map(decode_scalar::<f64>).transpose()?;

        debug!(len = weights.len(); "installing weights");
        self.model.set_weights(weights);
        if let Some(bias) = bias {
            debug!(bias = bias; "installing bias");
            self.model.set_bias(bias);
        }
        Ok(())
    }
}

impl<M: Model> Client for LocalClient<M> {
    /// Echoes the requested properties back unchanged.
    fn get_properties(&mut self, ins: PropertiesIns) -> Result<PropertiesRes> {
        Ok(PropertiesRes {
            status: Status::ok(),
            properties: ins.config,
        })
    }

    fn get_parameters(&self) -> Result<ParametersRes> {
        Ok(ParametersRes {
            parameters: self.parameters(),
        })
    }

    fn fit(&mut self, ins: FitIns) -> Result<FitRes> {
        info!("fitting");
        self.set_parameters(&ins.parameters)?;

        let summary = self
            .model
            .train(&self.datasets.training)
            .map_err(Error::model)?;
        debug!(
            num_examples = summary.num_examples,
            loss = summary.loss,
            metric = summary.metric;
            "training finished"
        );

        Ok(FitRes {
            status: Status::ok(),
            parameters: self.parameters(),
            num_examples: summary.num_examples,
            metrics: Metrics::new(),
        })
    }

    fn evaluate(&mut self, ins: EvaluateIns) -> Result<EvaluateRes> {
        info!("evaluating");
        self.set_parameters(&ins.parameters)?;

        let summary = self
            .model
            .evaluate(&self.datasets.test)
            .map_err(Error::model)?;

        let mut metrics = Metrics::new();
        metrics.insert(
            EVALUATE_METRIC_KEY.to_string(),
            Scalar::Float(summary.metric),
        );
        Ok(EvaluateRes {
            status: Status::ok(),
            loss: summary.loss,
            num_examples: summary.num_examples,
            metrics,
        })
    }
}
