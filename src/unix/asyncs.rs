pub use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter},
    net::UnixStream,
};

pub fn unix_split(
    stream: &mut UnixStream,
) -> (impl AsyncRead + Unpin + '_, impl AsyncWrite + Unpin + '_) {
    stream.split()
}
