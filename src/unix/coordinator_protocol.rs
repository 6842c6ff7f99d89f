use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::asyncs::{AsyncReadExt, AsyncWriteExt};
use crate::error::{Error, Result};
use crate::message_handler::{ClientMessage, ServerMessage};
use crate::parameter::Parameters;
use crate::tensor::Tensor;
use crate::typing::*;

/// One message on the wire: a JSON header followed by raw binary segments.
///
/// Layout, integers big-endian: `u32` segment count, `u64` header length,
/// header, then for each segment a `u64` length and its bytes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    pub header: Vec<u8>,
    pub segments: Vec<Bytes>,
}

/// Largest JSON header a peer may announce.
pub const MAX_HEADER_LENGTH: u64 = 64 * 1024 * 1024;
/// Largest single segment a peer may announce.
pub const MAX_SEGMENT_LENGTH: u64 = 1024 * 1024 * 1024;

fn checked_length(length: u64, max: u64, what: &str) -> std::io::Result<usize> {
    if length > max {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{what} of {length} bytes exceeds the {max} byte limit"),
        ));
    }
    usize::try_from(length).map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, format!("{what} too large"))
    })
}

/// Reads the next frame.
///
/// Returns `None` if the stream ends before the first byte of a frame. An end
/// of stream anywhere later is an `UnexpectedEof` error.
pub async fn read_frame(
    mut reader: impl super::asyncs::AsyncRead + Unpin,
) -> std::result::Result<Option<Frame>, std::io::Error> {
    let mut count = [0u8; 4];
    let first = reader.read(&mut count).await?;
    if first == 0 {
        return Ok(None);
    }
    reader.read_exact(&mut count[first..]).await?;
    let num_segments = u32::from_be_bytes(count);

    let header_length = checked_length(reader.read_u64().await?, MAX_HEADER_LENGTH, "header")?;
    let mut header = vec![0; header_length];
    reader.read_exact(&mut header).await?;

    let mut segments = Vec::with_capacity((num_segments as usize).min(64));
    for _ in 0..num_segments {
        let segment_length =
            checked_length(reader.read_u64().await?, MAX_SEGMENT_LENGTH, "segment")?;
        let mut buf = vec![0; segment_length];
        reader.read_exact(&mut buf).await?;
        segments.push(buf.into());
    }
    Ok(Some(Frame { header, segments }))
}

pub async fn write_frame(
    mut writer: impl super::asyncs::AsyncWrite + Unpin,
    frame: &Frame,
) -> std::result::Result<(), std::io::Error> {
    let num_segments = u32::try_from(frame.segments.len()).map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "too many segments in frame")
    })?;
    writer.write_u32(num_segments).await?;
    writer.write_u64(frame.header.len() as u64).await?;
    writer.write_all(&frame.header).await?;
    for segment in &frame.segments {
        writer.write_u64(segment.len() as u64).await?;
        writer.write_all(segment).await?;
    }
    writer.flush().await
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "camelCase")]
enum ServerHeader {
    #[serde(rename_all = "camelCase")]
    GetProperties {
        #[serde(default)]
        config: Properties,
    },
    #[serde(rename_all = "camelCase")]
    GetParameters {},
    #[serde(rename_all = "camelCase")]
    Fit {
        tensor_type: String,
        #[serde(default)]
        config: Config,
    },
    #[serde(rename_all = "camelCase")]
    Evaluate {
        tensor_type: String,
        #[serde(default)]
        config: Config,
    },
    #[serde(rename_all = "camelCase")]
    Reconnect { seconds: Option<u64> },
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "result", content = "params", rename_all = "camelCase")]
enum ClientHeader {
    #[serde(rename_all = "camelCase")]
    PropertiesRes {
        status: Status,
        properties: Properties,
    },
    #[serde(rename_all = "camelCase")]
    ParametersRes { tensor_type: String },
    #[serde(rename_all = "camelCase")]
    FitRes {
        status: Status,
        tensor_type: String,
        num_examples: u64,
        metrics: Metrics,
    },
    #[serde(rename_all = "camelCase")]
    EvaluateRes {
        status: Status,
        #[serde(with = "crate::typing::float_bits")]
        loss: f64,
        num_examples: u64,
        metrics: Metrics,
    },
    #[serde(rename_all = "camelCase")]
    Disconnect { reason: Reason },
    #[serde(rename_all = "camelCase")]
    Failure { details: String },
}

fn segments_of(parameters: &Parameters) -> Vec<Bytes> {
    parameters
        .tensors()
        .iter()
        .map(|tensor| tensor.clone().into_bytes())
        .collect()
}

fn parameters_from(tensor_type: String, segments: Vec<Bytes>) -> Parameters {
    Parameters::new(segments.into_iter().map(Tensor::from).collect(), tensor_type)
}

fn expect_no_segments(kind: &str, segments: &[Bytes]) -> Result<()> {
    if segments.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidMessage {
            reason: format!("{kind} carries {} unexpected segments", segments.len()),
        })
    }
}

pub fn encode_server_message(msg: &ServerMessage) -> Result<Frame> {
    let (header, segments) = match msg {
        ServerMessage::GetProperties(ins) => (
            ServerHeader::GetProperties {
                config: ins.config.clone(),
            },
            vec![],
        ),
        ServerMessage::GetParameters => (ServerHeader::GetParameters {}, vec![]),
        ServerMessage::Fit(ins) => (
            ServerHeader::Fit {
                tensor_type: ins.parameters.tensor_type().to_owned(),
                config: ins.config.clone(),
            },
            segments_of(&ins.parameters),
        ),
        ServerMessage::Evaluate(ins) => (
            ServerHeader::Evaluate {
                tensor_type: ins.parameters.tensor_type().to_owned(),
                config: ins.config.clone(),
            },
            segments_of(&ins.parameters),
        ),
        ServerMessage::Reconnect(ins) => (
            ServerHeader::Reconnect {
                seconds: ins.seconds,
            },
            vec![],
        ),
    };
    Ok(Frame {
        header: serde_json::to_vec(&header)?,
        segments,
    })
}

pub fn decode_server_message(frame: Frame) -> Result<ServerMessage> {
    let header: ServerHeader = serde_json::from_slice(&frame.header)?;
    let segments = frame.segments;
    let msg = match header {
        ServerHeader::GetProperties { config } => {
            expect_no_segments("getProperties", &segments)?;
            ServerMessage::GetProperties(PropertiesIns { config })
        }
        ServerHeader::GetParameters {} => {
            expect_no_segments("getParameters", &segments)?;
            ServerMessage::GetParameters
        }
        ServerHeader::Fit {
            tensor_type,
            config,
        } => ServerMessage::Fit(FitIns {
            parameters: parameters_from(tensor_type, segments),
            config,
        }),
        ServerHeader::Evaluate {
            tensor_type,
            config,
        } => ServerMessage::Evaluate(EvaluateIns {
            parameters: parameters_from(tensor_type, segments),
            config,
        }),
        ServerHeader::Reconnect { seconds } => {
            expect_no_segments("reconnect", &segments)?;
            ServerMessage::Reconnect(ReconnectIns { seconds })
        }
    };
    Ok(msg)
}

pub fn encode_client_message(msg: &ClientMessage) -> Result<Frame> {
    let (header, segments) = match msg {
        ClientMessage::PropertiesRes(res) => (
            ClientHeader::PropertiesRes {
                status: res.status.clone(),
                properties: res.properties.clone(),
            },
            vec![],
        ),
        ClientMessage::ParametersRes(res) => (
            ClientHeader::ParametersRes {
                tensor_type: res.parameters.tensor_type().to_owned(),
            },
            segments_of(&res.parameters),
        ),
        ClientMessage::FitRes(res) => (
            ClientHeader::FitRes {
                status: res.status.clone(),
                tensor_type: res.parameters.tensor_type().to_owned(),
                num_examples: res.num_examples,
                metrics: res.metrics.clone(),
            },
            segments_of(&res.parameters),
        ),
        ClientMessage::EvaluateRes(res) => (
            ClientHeader::EvaluateRes {
                status: res.status.clone(),
                loss: res.loss,
                num_examples: res.num_examples,
                metrics: res.metrics.clone(),
            },
            vec![],
        ),
        ClientMessage::Disconnect(res) => (ClientHeader::Disconnect { reason: res.reason }, vec![]),
        ClientMessage::Failure { details } => (
            ClientHeader::Failure {
                details: details.clone(),
            },
            vec![],
        ),
    };
    Ok(Frame {
        header: serde_json::to_vec(&header)?,
        segments,
    })
}

pub fn decode_client_message(frame: Frame) -> Result<ClientMessage> {
    let header: ClientHeader = serde_json::from_slice(&frame.header)?;
    let segments = frame.segments;
    let msg = match header {
        ClientHeader::PropertiesRes { status, properties } => {
            expect_no_segments("propertiesRes", &segments)?;
            ClientMessage::PropertiesRes(PropertiesRes { status, properties })
        }
        ClientHeader::ParametersRes { tensor_type } => ClientMessage::ParametersRes(ParametersRes {
            parameters: parameters_from(tensor_type, segments),
        }),
        ClientHeader::FitRes {
            status,
            tensor_type,
            num_examples,
            metrics,
        } => ClientMessage::FitRes(FitRes {
            status,
            parameters: parameters_from(tensor_type, segments),
            num_examples,
            metrics,
        }),
        ClientHeader::EvaluateRes {
            status,
            loss,
            num_examples,
            metrics,
        } => {
            expect_no_segments("evaluateRes", &segments)?;
            ClientMessage::EvaluateRes(EvaluateRes {
                status,
                loss,
                num_examples,
                metrics,
            })
        }
        ClientHeader::Disconnect { reason } => {
            expect_no_segments("disconnect", &segments)?;
            ClientMessage::Disconnect(DisconnectRes { reason })
        }
        ClientHeader::Failure { details } => {
            expect_no_segments("failure", &segments)?;
            ClientMessage::Failure { details }
        }
    };
    Ok(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::DOUBLE_TENSOR_TYPE;
    use crate::tensor::{encode_array, encode_scalar};

    #[tokio::test]
    async fn frame_layout_is_length_prefixed() {
        let frame = Frame {
            header: b"{}".to_vec(),
            segments: vec![Bytes::from_static(&[1, 2, 3])],
        };
        let mut buf = Vec::new();
        write_frame(&mut buf, &frame).await.unwrap();

        let mut expected = vec![0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 2, b'{', b'}'];
        expected.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 3, 1, 2, 3]);
        assert_eq!(buf, expected);

        let read = read_frame(buf.as_slice()).await.unwrap();
        assert_eq!(read, Some(frame));
    }

    #[tokio::test]
    async fn end_of_stream_between_frames_is_not_an_error() {
        assert_eq!(read_frame(&[0u8; 0][..]).await.unwrap(), None);
    }

    #[tokio::test]
    async fn truncated_frame_is_an_io_error() {
        let err = read_frame(&[0u8, 0, 0, 1][..]).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);

        // cut inside the segment count itself
        let err = read_frame(&[0u8, 0][..]).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn oversized_lengths_are_rejected_before_allocating() {
        let mut buf = vec![0u8, 0, 0, 0];
        buf.extend_from_slice(&u64::MAX.to_be_bytes());
        let err = read_frame(buf.as_slice()).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);

        let mut buf = vec![0u8, 0, 0, 1];
        buf.extend_from_slice(&2u64.to_be_bytes());
        buf.extend_from_slice(b"{}");
        buf.extend_from_slice(&(MAX_SEGMENT_LENGTH + 1).to_be_bytes());
        let err = read_frame(buf.as_slice()).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn fit_tensors_travel_as_segments() {
        let parameters = Parameters::new(
            vec![encode_array(&[1.0, 2.0]), encode_scalar(0.5)],
            DOUBLE_TENSOR_TYPE,
        );
        let msg = ServerMessage::Fit(FitIns {
            parameters: parameters.clone(),
            config: Config::new(),
        });

        let frame = encode_server_message(&msg).unwrap();
        assert_eq!(frame.segments.len(), 2);
        assert_eq!(frame.segments[0].len(), 16);
        let header: serde_json::Value = serde_json::from_slice(&frame.header).unwrap();
        assert_eq!(header["method"], "fit");
        assert_eq!(header["params"]["tensorType"], DOUBLE_TENSOR_TYPE);

        assert_eq!(decode_server_message(frame).unwrap(), msg);
    }

    #[test]
    fn accepts_minimal_headers() {
        let frame = Frame {
            header: br#"{"method":"evaluate","params":{"tensorType":"cpp_double"}}"#.to_vec(),
            segments: vec![],
        };
        let ServerMessage::Evaluate(ins) = decode_server_message(frame).unwrap() else {
            panic!("expected evaluate");
        };
        assert!(ins.parameters.is_empty());
        assert!(ins.config.is_empty());
    }

    #[test]
    fn rejects_unknown_methods_and_stray_segments() {
        let unknown = Frame {
            header: br#"{"method":"shutdown","params":{}}"#.to_vec(),
            segments: vec![],
        };
        assert!(matches!(decode_server_message(unknown), Err(Error::Json(_))));

        let stray = Frame {
            header: br#"{"method":"getParameters","params":{}}"#.to_vec(),
            segments: vec![Bytes::from_static(&[0; 8])],
        };
        assert!(matches!(
            decode_server_message(stray),
            Err(Error::InvalidMessage { .. })
        ));
    }

    #[test]
    fn evaluate_result_keeps_metrics() {
        let mut metrics = Metrics::new();
        metrics.insert("loss".to_string(), Scalar::Float(0.95));
        let msg = ClientMessage::EvaluateRes(EvaluateRes {
            status: Status::ok(),
            loss: 0.1,
            num_examples: 5,
            metrics,
        });

        let frame = encode_client_message(&msg).unwrap();
        let header: serde_json::Value = serde_json::from_slice(&frame.header).unwrap();
        assert_eq!(header["result"], "evaluateRes");
        assert_eq!(header["params"]["metrics"]["loss"]["float"], 0.95f64.to_bits());
        assert_eq!(header["params"]["loss"], 0.1f64.to_bits());
        assert_eq!(decode_client_message(frame).unwrap(), msg);
    }

    #[test]
    fn non_finite_floats_survive_the_header() {
        let mut metrics = Metrics::new();
        metrics.insert("loss".to_string(), Scalar::Float(f64::INFINITY));
        metrics.insert("floor".to_string(), Scalar::Float(f64::NEG_INFINITY));
        let msg = ClientMessage::EvaluateRes(EvaluateRes {
            status: Status::ok(),
            loss: f64::NAN,
            num_examples: 5,
            metrics,
        });

        let frame = encode_client_message(&msg).unwrap();
        let ClientMessage::EvaluateRes(res) = decode_client_message(frame).unwrap() else {
            panic!("expected evaluateRes");
        };
        assert_eq!(res.loss.to_bits(), f64::NAN.to_bits());
        assert_eq!(res.metrics["loss"], Scalar::Float(f64::INFINITY));
        assert_eq!(res.metrics["floor"], Scalar::Float(f64::NEG_INFINITY));

        let mut config = Config::new();
        config.insert("lr".to_string(), Scalar::Float(-0.0));
        let frame = encode_server_message(&ServerMessage::GetProperties(PropertiesIns {
            config,
        }))
        .unwrap();
        let ServerMessage::GetProperties(ins) = decode_server_message(frame).unwrap() else {
            panic!("expected getProperties");
        };
        let Scalar::Float(lr) = &ins.config["lr"] else {
            panic!("expected a float");
        };
        assert_eq!(lr.to_bits(), (-0.0f64).to_bits());
    }
}
