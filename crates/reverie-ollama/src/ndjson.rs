// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Newline-delimited JSON stream decoding.
//!
//! Ollama streams one JSON object per line. Network chunks do not respect
//! line boundaries, so bytes are buffered until a full line is available.

use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use reverie_core::ReverieError;
use serde::de::DeserializeOwned;

/// Stream of decoded NDJSON values.
pub type NdjsonStream<T> = Pin<Box<dyn Stream<Item = Result<T, ReverieError>> + Send>>;

struct LineReader {
    bytes: BoxStream<'static, reqwest::Result<Bytes>>,
    buffer: BytesMut,
    finished: bool,
}

impl LineReader {
    /// Removes the next complete line from the buffer. After the body ends,
    /// a trailing line without a newline is returned as well.
    fn take_line(&mut self) -> Option<BytesMut> {
        if let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line = self.buffer.split_to(pos + 1);
            line.truncate(pos);
            return Some(line);
        }
        if self.finished && !self.buffer.is_empty() {
            return Some(self.buffer.split());
        }
        None
    }
}

/// Decodes a streaming response body into `T` values, one per non-blank line.
pub fn parse_ndjson_stream<T>(response: reqwest::Response) -> NdjsonStream<T>
where
    T: DeserializeOwned + Send + 'static,
{
    decode(response.bytes_stream().boxed())
}

fn decode<T>(bytes: BoxStream<'static, reqwest::Result<Bytes>>) -> NdjsonStream<T>
where
    T: DeserializeOwned + Send + 'static,
{
    let reader = LineReader {
        bytes,
        buffer: BytesMut::new(),
        finished: false,
    };

    let values = stream::unfold(reader, |mut reader| async move {
        loop {
            if let Some(line) = reader.take_line() {
                let text = String::from_utf8_lossy(&line);
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                let value = serde_json::from_str::<T>(text).map_err(|e| ReverieError::Provider {
                    message: format!("malformed stream line: {e}"),
                    source: Some(Box::new(e)),
                });
                return Some((value, reader));
            }

            if reader.finished {
                return None;
            }

            match reader.bytes.next().await {
                Some(Ok(chunk)) => reader.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    reader.finished = true;
                    reader.buffer.clear();
                    let err = ReverieError::Provider {
                        message: format!("stream interrupted: {e}"),
                        source: Some(Box::new(e)),
                    };
                    return Some((Err(err), reader));
                }
                None => reader.finished = true,
            }
        }
    });

    Box::pin(values)
}
