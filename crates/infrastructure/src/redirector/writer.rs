use squid_tagger_domain::DomainError;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Spawn the only task allowed to write to `output`.
///
/// Each received string is written as one line. Replies already queued are
/// written together before a single flush. The task ends once every sender
/// is dropped and returns the number of lines written.
pub fn spawn_reply_writer<W>(
    mut output: W,
    capacity: usize,
) -> (mpsc::Sender<String>, JoinHandle<Result<u64, DomainError>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<String>(capacity.max(1));

    let handle = tokio::spawn(async move {
        let mut written = 0u64;

        while let Some(reply) = rx.recv().await {
            write_line(&mut output, &reply).await?;
            written += 1;

            while let Ok(reply) = rx.try_recv() {
                write_line(&mut output, &reply).await?;
                written += 1;
            }

            output.flush().await?;
        }

        debug!(written, "Reply writer finished");
        Ok(written)
    });

    (tx, handle)
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, reply: &str) -> Result<(), DomainError> {
    debug!(reply, "Reply line out");
    output.write_all(reply.as_bytes()).await?;
    output.write_all(b"\n").await?;
    Ok(())
}
