mod asyncs;
pub mod coordinator_protocol;

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use log::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::message_handler::{self, ClientMessage};
use crate::trait_def::Client;

struct PanicInfo {
    backtrace: String,
    location: Option<(String, u32, u32)>,
    thread_name: Option<String>,
}

lazy_static::lazy_static! {
    static ref PANIC_INFO: Arc<Mutex<Option<PanicInfo>>> = Arc::new(Mutex::new(None));
}

fn panic_hook(msg: &std::panic::PanicHookInfo) {
    if let Ok(mut slot) = PANIC_INFO.lock() {
        *slot = Some(PanicInfo {
            backtrace: std::backtrace::Backtrace::force_capture().to_string(),
            location: msg
                .location()
                .map(|x| (x.file().to_owned(), x.line(), x.column())),
            thread_name: std::thread::current().name().map(|x| x.to_owned()),
        });
    }
}

fn format_panic(e: Box<dyn std::any::Any + Send>) -> String {
    let panic_info = PANIC_INFO
        .lock()
        .ok()
        .and_then(|mut slot| slot.take())
        .unwrap_or_else(|| PanicInfo {
            backtrace: "<Backtrace not found>".to_string(),
            location: None,
            thread_name: None,
        });
    let location = if let Some(location) = panic_info.location {
        format!(" at {}:{}:{}", location.0, location.1, location.2)
    } else {
        "".to_string()
    };
    let thread_name = if let Some(thread_name) = panic_info.thread_name {
        format!("Thread '{thread_name}' p")
    } else {
        "P".to_string()
    };
    let payload = if let Some(val) = e.downcast_ref::<&str>() {
        val.to_string()
    } else if let Some(val) = e.downcast_ref::<String>() {
        val.clone()
    } else {
        "<unknown panic info>.".to_string()
    };
    format!(
        "{thread_name}anicked{location}:\n{payload}\nBacktrace:\n{}",
        panic_info.backtrace,
    )
}

async fn send<W: asyncs::AsyncWrite + Unpin>(writer: &mut W, msg: &ClientMessage) -> Result<()> {
    let frame = coordinator_protocol::encode_client_message(msg)?;
    coordinator_protocol::write_frame(writer, &frame).await?;
    Ok(())
}

/// Serves coordinator requests one at a time until the coordinator asks the
/// client to disconnect or closes the connection.
///
/// A request that fails is answered with [`ClientMessage::Failure`] and the
/// session continues. A panic inside the client is reported the same way and
/// then ends the session, since the model may be half updated.
///
/// Returns how long the coordinator asked the client to wait before
/// reconnecting, if it did.
pub async fn run_client<C, R, W>(
    client: &mut C,
    mut reader: R,
    mut writer: W,
) -> Result<Option<Duration>>
where
    C: Client,
    R: asyncs::AsyncRead + Unpin,
    W: asyncs::AsyncWrite + Unpin,
{
    loop {
        let Some(frame) = coordinator_protocol::read_frame(&mut reader).await? else {
            info!("coordinator closed the connection");
            return Ok(None);
        };
        debug!(segments = frame.segments.len(); "received frame");

        let msg = match coordinator_protocol::decode_server_message(frame) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("rejected message from coordinator: {e}");
                let details = e.to_string();
                send(&mut writer, &ClientMessage::Failure { details }).await?;
                continue;
            }
        };

        let request = msg.name();
        info!(request = request; "handling request");
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            message_handler::handle(&mut *client, msg)
        }));

        match outcome {
            Ok(Ok(handled)) => {
                send(&mut writer, &handled.message).await?;
                if !handled.keep_going {
                    info!("disconnecting");
                    return Ok(handled.sleep_duration);
                }
            }
            Ok(Err(e)) => {
                warn!(request = request; "request failed: {e}");
                let details = e.to_string();
                send(&mut writer, &ClientMessage::Failure { details }).await?;
            }
            Err(panic) => {
                let details = format_panic(panic);
                warn!(request = request; "client panicked");
                send(
                    &mut writer,
                    &ClientMessage::Failure {
                        details: details.clone(),
                    },
                )
                .await?;
                return Err(Error::Panicked { details });
            }
        }
    }
}

/// Connects to the coordinator at `config.ipc_path` and serves it until it
/// disconnects the client.
pub async fn start_client<C: Client>(
    client: &mut C,
    config: &ClientConfig,
) -> Result<Option<Duration>> {
    std::panic::set_hook(Box::new(panic_hook));

    info!(
        client_id = config.client_id.as_str();
        "connecting to coordinator at {}",
        config.ipc_path.display()
    );
    let mut connection = asyncs::UnixStream::connect(&config.ipc_path).await?;
    let (reader, writer) = asyncs::unix_split(&mut connection);

    let writer = asyncs::BufWriter::new(writer);
    let reader = asyncs::BufReader::new(reader);

    run_client(client, reader, writer).await
}
