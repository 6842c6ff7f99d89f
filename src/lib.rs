//! Client side of a federated learning round trip.
//!
//! A [`LocalClient`] holds one [`Model`] and its datasets and answers the
//! coordinator's four requests: report properties, hand out parameters, fit
//! on local data and evaluate on local data. Model state travels as
//! [`Parameters`], an ordered list of [`Tensor`]s produced by the codec in
//! [`tensor`].

#[cfg(target_family = "unix")]
mod unix;

#[cfg(target_family = "unix")]
pub use unix::*;

mod client;
mod config;
mod error;
pub mod message_handler;
mod parameter;
pub mod tensor;
mod trait_def;
mod typing;

pub use client::*;
pub use config::*;
pub use error::*;
pub use message_handler::{ClientMessage, Handled, ServerMessage};
pub use parameter::*;
pub use tensor::{Tensor, TensorElement};
pub use trait_def::*;
pub use typing::*;

pub use bytes;
