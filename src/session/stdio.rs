// src/session/stdio.rs

use std::future::Future;
use std::pin::Pin;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};

use super::{MessageSink, MessageSource};
use crate::errors::Result;

/// Reads one message per line; blank lines are skipped.
pub struct LineSource<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin + Send> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

impl<R: AsyncBufRead + Unpin + Send> MessageSource for LineSource<R> {
    fn recv(&mut self) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + '_>> {
        Box::pin(async move {
            while let Some(line) = self.lines.next_line().await? {
                if !line.trim().is_empty() {
                    return Ok(Some(line));
                }
            }
            Ok(None)
        })
    }
}

/// Writes one message per line and flushes after each.
pub struct LineSink<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> LineSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: AsyncWrite + Unpin + Send> MessageSink for LineSink<W> {
    fn send(&mut self, text: String) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.writer.write_all(text.as_bytes()).await?;
            self.writer.write_all(b"\n").await?;
            self.writer.flush().await?;
            Ok(())
        })
    }
}

/// Session over the process's stdin and stdout.
pub fn stdio() -> (
    LineSource<BufReader<tokio::io::Stdin>>,
    LineSink<tokio::io::Stdout>,
) {
    (
        LineSource::new(BufReader::new(tokio::io::stdin())),
        LineSink::new(tokio::io::stdout()),
    )
}
