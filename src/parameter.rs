use crate::tensor::Tensor;

/// Type tag for tensors holding native-order IEEE-754 doubles.
pub const DOUBLE_TENSOR_TYPE: &str = "cpp_double";

/// Ordered tensors plus the tag naming how they were encoded.
///
/// By convention index 0 is the weight vector and index 1 the bias scalar.
/// Handlers build a fresh value for every response instead of mutating one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Parameters {
    tensors: Vec<Tensor>,
    tensor_type: String,
}

impl Parameters {
    /// An empty tensor list is legal and means "no parameters".
    pub fn new(tensors: Vec<Tensor>, tensor_type: impl Into<String>) -> Self {
        Self {
            tensors,
            tensor_type: tensor_type.into(),
        }
    }

    pub fn tensors(&self) -> &[Tensor] {
        &self.tensors
    }

    pub fn tensor_type(&self) -> &str {
        &self.tensor_type
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn into_tensors(self) -> Vec<Tensor> {
        self.tensors
    }
}
