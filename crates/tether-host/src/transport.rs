//! Newline-delimited JSON transport.
//!
//! Generic over the reader and writer so tests run against in-memory
//! buffers while the binary uses real stdin/stdout. Each response is
//! flushed immediately; the parent reads line by line.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use tether_core::protocol::Response;

use crate::errors::HostError;

/// One record per line in both directions.
pub struct LineTransport<R, W> {
    reader: R,
    writer: W,
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Wrap a reader/writer pair.
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Read the next input line.
    ///
    /// `Ok(None)` is a clean end of stream; an I/O error is fatal to the
    /// loop.
    pub async fn next_line(&mut self) -> Result<Option<String>, HostError> {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line).await?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }

    /// Write one response line and flush.
    pub async fn send(&mut self, response: &Response) -> Result<(), HostError> {
        let mut line = serde_json::to_string(response)?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Tear down into the underlying reader and writer.
    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transport_over(input: &str) -> LineTransport<&[u8], Vec<u8>> {
        LineTransport::new(input.as_bytes(), Vec::new())
    }

    #[tokio::test]
    async fn test_next_line_reads_until_eof() {
        let mut transport = transport_over("one\ntwo\n");
        assert_eq!(transport.next_line().await.unwrap(), Some("one\n".to_string()));
        assert_eq!(transport.next_line().await.unwrap(), Some("two\n".to_string()));
        assert_eq!(transport.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_send_writes_one_line_per_response() {
        let mut transport = transport_over("");
        transport
            .send(&Response::success(Some(json!(1))))
            .await
            .unwrap();
        transport
            .send(&Response::failure(Some(json!(2)), "nope"))
            .await
            .unwrap();
        let (_, written) = transport.into_parts();
        let text = String::from_utf8(written).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(lines[0]).unwrap()["id"],
            1
        );
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(lines[1]).unwrap()["error"],
            "nope"
        );
    }
}
