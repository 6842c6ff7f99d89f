use crate::error::Result;
use crate::typing::*;

/// Outcome of one local training pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrainSummary {
    pub num_examples: u64,
    pub loss: f32,
    pub metric: f64,
}

/// Outcome of one evaluation pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EvaluateSummary {
    pub num_examples: u64,
    pub loss: f64,
    pub metric: f64,
}

/// The local model whose weight vector and bias are exchanged with the
/// coordinator.
///
/// Training and evaluation are opaque here; the client only installs
/// parameters before calling them and reads them back afterwards.
pub trait Model {
    /// Handle to local data, passed through to `train`/`evaluate` unexamined.
    type Dataset;

    type Error: std::error::Error + Send + Sync + 'static;

    fn weights(&self) -> Vec<f64>;

    /// Replaces the whole weight vector.
    fn set_weights(&mut self, weights: Vec<f64>);

    fn bias(&self) -> f64;

    fn set_bias(&mut self, bias: f64);

    fn train(&mut self, dataset: &Self::Dataset) -> std::result::Result<TrainSummary, Self::Error>;

    fn evaluate(
        &mut self,
        dataset: &Self::Dataset,
    ) -> std::result::Result<EvaluateSummary, Self::Error>;
}

/// The four requests a coordinator can issue to a client.
///
/// Methods take `&mut self` when they may overwrite model state. Callers must
/// serialize requests; nothing here locks.
pub trait Client {
    /// Clients that do not report properties answer with
    /// [`Code::GetPropertiesNotImplemented`] and an empty map.
    fn get_properties(&mut self, ins: PropertiesIns) -> Result<PropertiesRes> {
        let _ = ins;
        Ok(PropertiesRes {
            status: Status {
                code: Code::GetPropertiesNotImplemented,
                message: "Client does not implement get_properties".to_string(),
            },
            properties: Properties::new(),
        })
    }

    fn get_parameters(&self) -> Result<ParametersRes>;

    fn fit(&mut self, ins: FitIns) -> Result<FitRes>;

    fn evaluate(&mut self, ins: EvaluateIns) -> Result<EvaluateRes>;
}
