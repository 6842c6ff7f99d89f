//! Dispatch of coordinator messages to a [`Client`].

use std::time::Duration;

use log::info;

use crate::error::Result;
use crate::trait_def::Client;
use crate::typing::*;

/// A request from the coordinator.
#[derive(Clone, Debug, PartialEq)]
pub enum ServerMessage {
    GetProperties(PropertiesIns),
    GetParameters,
    Fit(FitIns),
    Evaluate(EvaluateIns),
    Reconnect(ReconnectIns),
}

impl ServerMessage {
    pub fn name(&self) -> &'static str {
        match self {
            ServerMessage::GetProperties(_) => "get_properties",
            ServerMessage::GetParameters => "get_parameters",
            ServerMessage::Fit(_) => "fit",
            ServerMessage::Evaluate(_) => "evaluate",
            ServerMessage::Reconnect(_) => "reconnect",
        }
    }
}

/// A reply to the coordinator.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientMessage {
    PropertiesRes(PropertiesRes),
    ParametersRes(ParametersRes),
    FitRes(FitRes),
    EvaluateRes(EvaluateRes),
    Disconnect(DisconnectRes),
    /// Sent by the transport when a request failed.
    Failure { details: String },
}

/// What the transport should do after answering a message.
#[derive(Clone, Debug, PartialEq)]
pub struct Handled {
    pub message: ClientMessage,
    /// How long to stay away before reconnecting, if the coordinator said.
    pub sleep_duration: Option<Duration>,
    /// False once the coordinator asked the client to disconnect.
    pub keep_going: bool,
}

impl Handled {
    fn reply(message: ClientMessage) -> Self {
        Self {
            message,
            sleep_duration: None,
            keep_going: true,
        }
    }
}

pub fn handle(client: &mut impl Client, msg: ServerMessage) -> Result<Handled> {
    let handled = match msg {
        ServerMessage::GetProperties(ins) => {
            Handled::reply(ClientMessage::PropertiesRes(client.get_properties(ins)?))
        }
        ServerMessage::GetParameters => {
            Handled::reply(ClientMessage::ParametersRes(client.get_parameters()?))
        }
        ServerMessage::Fit(ins) => Handled::reply(ClientMessage::FitRes(client.fit(ins)?)),
        ServerMessage::Evaluate(ins) => {
            Handled::reply(ClientMessage::EvaluateRes(client.evaluate(ins)?))
        }
        ServerMessage::Reconnect(ins) => {
            let reason = match ins.seconds {
                Some(_) => Reason::Reconnect,
                None => Reason::Ack,
            };
            info!(seconds = ins.seconds; "disconnect requested");
            Handled {
                message: ClientMessage::Disconnect(DisconnectRes { reason }),
                sleep_duration: ins.sleep_duration(),
                keep_going: false,
            }
        }
    };
    Ok(handled)
}
