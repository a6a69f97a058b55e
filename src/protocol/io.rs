use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

use crate::error::{AppError, AppResult, DistributedError, ProtocolError};

pub(crate) const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Reads one line without its `\r\n` / `\n` terminator.
///
/// Returns `None` once the peer has closed the connection. Lines longer than
/// the size cap are consumed up to their newline but never buffered whole.
///
/// # Errors
///
/// Returns an error on socket failures, oversized lines, or invalid UTF-8.
pub async fn read_line<R>(reader: &mut R) -> AppResult<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buffer: Vec<u8> = Vec::with_capacity(128);
    let mut consumed_any = false;
    let mut too_long = false;
    loop {
        let available = reader.fill_buf().await.map_err(|err| {
            AppError::distributed(DistributedError::Io {
                context: "read line",
                source: err,
            })
        })?;
        if available.is_empty() {
            break;
        }
        consumed_any = true;
        let newline = available.iter().position(|byte| *byte == b'\n');
        let used = newline.map_or(available.len(), |index| index.saturating_add(1));
        let chunk = available.get(..used).unwrap_or(available);
        if !too_long {
            if buffer.len().saturating_add(chunk.len()) > MAX_LINE_BYTES {
                too_long = true;
                buffer = Vec::new();
            } else {
                buffer.extend_from_slice(chunk);
            }
        }
        reader.consume(used);
        if newline.is_some() {
            break;
        }
    }
    if !consumed_any {
        return Ok(None);
    }
    if too_long {
        return Err(AppError::protocol(ProtocolError::LineTooLong {
            max: MAX_LINE_BYTES,
        }));
    }
    if buffer.ends_with(b"\n") {
        buffer.pop();
        if buffer.ends_with(b"\r") {
            buffer.pop();
        }
    }
    let line = String::from_utf8(buffer).map_err(|err| {
        AppError::protocol(ProtocolError::InvalidUtf8 {
            source: err.utf8_error(),
        })
    })?;
    Ok(Some(line))
}

/// Like [`read_line`], but logs and skips oversized or non UTF-8 lines.
///
/// # Errors
///
/// Returns an error only when the socket itself fails.
pub async fn read_valid_line<R>(reader: &mut R) -> AppResult<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let result = read_line(reader).await;
        if let Err(AppError::Protocol(err)) = &result {
            warn!("Skipping malformed line: {}", err);
            continue;
        }
        return result;
    }
}

/// Reads exactly `count` lines, dropping the malformed ones.
///
/// # Errors
///
/// Returns an error when the connection closes early.
pub async fn read_counted_lines<R>(
    reader: &mut R,
    count: usize,
    context: &'static str,
) -> AppResult<Vec<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = Vec::with_capacity(count.min(4096));
    for _ in 0..count {
        let result = read_line(reader).await;
        // A malformed line still uses up one of the announced lines.
        if let Err(AppError::Protocol(err)) = &result {
            warn!("Skipping malformed {} line: {}", context, err);
            continue;
        }
        match result? {
            Some(line) => lines.push(line),
            None => {
                return Err(AppError::protocol(ProtocolError::UnexpectedEof { context }));
            }
        }
    }
    Ok(lines)
}

/// Reads lines until `terminator`, which is consumed but not returned.
///
/// # Errors
///
/// Returns an error when the connection closes before the terminator.
pub async fn read_until_terminator<R>(
    reader: &mut R,
    terminator: &str,
    context: &'static str,
) -> AppResult<Vec<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = Vec::new();
    loop {
        match read_valid_line(reader).await? {
            Some(line) if line.trim() == terminator => return Ok(lines),
            Some(line) => lines.push(line),
            None => {
                return Err(AppError::protocol(ProtocolError::UnexpectedEof { context }));
            }
        }
    }
}

/// Writes `line` followed by `\n` and flushes.
///
/// # Errors
///
/// Returns an error when the socket write fails.
pub async fn write_line<W>(writer: &mut W, line: &str) -> AppResult<()>
where
    W: AsyncWrite + Unpin,
{
    write_lines(writer, std::iter::once(line)).await
}

/// Writes several lines with a single flush at the end.
///
/// # Errors
///
/// Returns an error when the socket write fails.
pub async fn write_lines<'line, W, I>(writer: &mut W, lines: I) -> AppResult<()>
where
    W: AsyncWrite + Unpin,
    I: IntoIterator<Item = &'line str>,
{
    let mut payload = String::new();
    for line in lines {
        payload.push_str(line);
        payload.push('\n');
    }
    let io_err = |err| {
        AppError::distributed(DistributedError::Io {
            context: "write line",
            source: err,
        })
    };
    writer.write_all(payload.as_bytes()).await.map_err(io_err)?;
    writer.flush().await.map_err(io_err)
}
