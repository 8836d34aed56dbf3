//! Cancellable streaming copy.

use std::error::Error as StdError;

use futures_util::{Stream, StreamExt};
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum CopyError {
    #[error("copy was cancelled")]
    Cancelled,

    /// `copied` bytes were written before the read failed
    #[error("failed to read response body after {copied} bytes: {source}")]
    Read {
        copied: u64,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("failed to write downloaded data: {0}")]
    Write(#[from] std::io::Error),
}

/// Copy every chunk of `stream` into `writer`, returning the byte count.
///
/// Each wait for the next chunk races `cancel`, so a cancelled copy stops
/// without waiting for the peer to send more data.
pub async fn copy_cancellable<S, B, E, W>(
    mut stream: S,
    writer: &mut W,
    cancel: &CancellationToken,
) -> Result<u64, CopyError>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Into<Box<dyn StdError + Send + Sync>>,
    W: AsyncWrite + Unpin,
{
    let mut copied: u64 = 0;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CopyError::Cancelled),
            next = stream.next() => next,
        };

        let Some(chunk) = next else {
            break;
        };
        let chunk = chunk.map_err(|e| CopyError::Read {
            copied,
            source: e.into(),
        })?;
        let bytes = chunk.as_ref();

        writer.write_all(bytes).await?;
        copied += bytes.len() as u64;
        log::trace!("Copied {} bytes", copied);
    }

    writer.flush().await?;
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use std::io;
    use std::time::Duration;

    #[tokio::test]
    async fn test_copies_all_chunks() {
        let chunks: Vec<Result<Vec<u8>, io::Error>> =
            vec![Ok(b"hello ".to_vec()), Ok(b"world".to_vec())];
        let mut out = Vec::new();

        let copied = copy_cancellable(stream::iter(chunks), &mut out, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(copied, 11);
        assert_eq!(out, b"hello world");
    }

    #[tokio::test]
    async fn test_read_error_is_reported() {
        let chunks: Vec<Result<Vec<u8>, io::Error>> = vec![
            Ok(b"partial".to_vec()),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ];
        let mut out = Vec::new();

        let err = copy_cancellable(stream::iter(chunks), &mut out, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, CopyError::Read { copied: 7, .. }));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_stalled_stream() {
        let chunks: Vec<Result<Vec<u8>, io::Error>> = vec![Ok(b"first".to_vec())];
        let stalled = stream::iter(chunks).chain(stream::pending());
        let mut out = Vec::new();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            copy_cancellable(stalled, &mut out, &cancel),
        )
        .await
        .expect("copy should stop once cancelled");

        assert!(matches!(result, Err(CopyError::Cancelled)));
        assert_eq!(out, b"first");
    }

    #[test]
    fn test_stalled_copy_stays_pending_until_cancelled() {
        let chunks: Vec<Result<Vec<u8>, io::Error>> = vec![Ok(b"first".to_vec())];
        let stalled = stream::iter(chunks).chain(stream::pending());
        let mut out = Vec::new();
        let cancel = CancellationToken::new();

        {
            let mut copy = tokio_test::task::spawn(copy_cancellable(stalled, &mut out, &cancel));
            tokio_test::assert_pending!(copy.poll());

            cancel.cancel();
            assert!(copy.is_woken());
            let result = tokio_test::assert_ready!(copy.poll());
            assert!(matches!(result, Err(CopyError::Cancelled)));
        }

        assert_eq!(out, b"first");
    }

    #[tokio::test]
    async fn test_already_cancelled_copies_nothing() {
        let chunks: Vec<Result<Vec<u8>, io::Error>> = vec![Ok(b"data".to_vec())];
        let mut out = Vec::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = copy_cancellable(stream::iter(chunks), &mut out, &cancel).await;

        assert!(matches!(result, Err(CopyError::Cancelled)));
        assert!(out.is_empty());
    }
}
