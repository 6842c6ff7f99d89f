//! Request and response types exchanged with the coordinator.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::parameter::Parameters;

/// Value type allowed in metrics, properties and config maps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scalar {
    Bool(bool),
    Bytes(Vec<u8>),
    Float(#[serde(with = "float_bits")] f64),
    Int(i64),
    Str(String),
}

/// Carries an `f64` as its IEEE-754 bit pattern, so NaN and the infinities
/// survive JSON unchanged.
pub(crate) mod float_bits {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.to_bits())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        u64::deserialize(deserializer).map(f64::from_bits)
    }
}

pub type Metrics = HashMap<String, Scalar>;
pub type Properties = HashMap<String, Scalar>;
pub type Config = HashMap<String, Scalar>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Code {
    Ok,
    GetPropertiesNotImplemented,
    GetParametersNotImplemented,
    FitNotImplemented,
    EvaluateNotImplemented,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub code: Code,
    pub message: String,
}

impl Status {
    pub fn ok() -> Self {
        Self {
            code: Code::Ok,
            message: String::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertiesIns {
    pub config: Properties,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PropertiesRes {
    pub status: Status,
    pub properties: Properties,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParametersRes {
    pub parameters: Parameters,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FitIns {
    pub parameters: Parameters,
    pub config: Config,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FitRes {
    pub status: Status,
    /// Weights after local training, not the ones received.
    pub parameters: Parameters,
    pub num_examples: u64,
    pub metrics: Metrics,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EvaluateIns {
    pub parameters: Parameters,
    pub config: Config,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EvaluateRes {
    pub status: Status,
    pub loss: f64,
    pub num_examples: u64,
    pub metrics: Metrics,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconnectIns {
    pub seconds: Option<u64>,
}

impl ReconnectIns {
    pub fn sleep_duration(&self) -> Option<Duration> {
        self.seconds.map(Duration::from_secs)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    Ack,
    Reconnect,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisconnectRes {
    pub reason: Reason,
}
