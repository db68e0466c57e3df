use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{info, warn};

use crate::codec::{read_frame, write_frame, ProtocolError};
use crate::dispatch::Dispatcher;

/// Drive the host loop until the input closes: block on a length prefix,
/// dispatch the decoded request, write one response frame, repeat. A
/// malformed or truncated frame is treated as end-of-stream. The only error
/// that escapes is a failure to write a response; the caller is expected to
/// attempt one best-effort error frame before exiting.
pub async fn run_host_loop<R, W>(
    dispatcher: &Dispatcher,
    reader: &mut R,
    writer: &mut W,
) -> Result<(), ProtocolError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("native messaging host loop started");

    loop {
        let request = match read_frame(reader).await {
            Ok(Some(request)) => request,
            Ok(None) => {
                info!("input closed, shutting down");
                return Ok(());
            }
            Err(error) => {
                warn!(%error, "unreadable frame, treating as end of stream");
                return Ok(());
            }
        };

        let response = dispatcher.handle(request).await;
        write_frame(writer, &response).await?;
    }
}
