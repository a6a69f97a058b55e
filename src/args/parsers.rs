use crate::error::{AppError, AppResult, ValidationError};

use super::types::PositiveUsize;

pub(super) fn parse_positive_usize(s: &str) -> AppResult<PositiveUsize> {
    s.parse::<PositiveUsize>().map_err(AppError::from)
}

/// Splits `host[:port]`, falling back to `default_port`.
///
/// IPv6 hosts need brackets when a port is given (`[::1]:24226`).
///
/// # Errors
///
/// Returns an error for empty hosts or unparsable ports.
pub fn parse_address(value: &str, default_port: u16) -> Result<(String, u16), ValidationError> {
    let value = value.trim();
    let invalid = || ValidationError::InvalidAddress {
        value: value.to_owned(),
    };

    let (host, port) = if let Some(bracketed) = value.strip_prefix('[') {
        let (host, rest) = bracketed.split_once(']').ok_or_else(invalid)?;
        let port = match rest.strip_prefix(':') {
            Some(port) => Some(port),
            None if rest.is_empty() => None,
            None => return Err(invalid()),
        };
        (host, port)
    } else {
        match value.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') => (host, Some(port)),
            Some(_) | None => (value, None),
        }
    };

    let host = host.trim();
    if host.is_empty() {
        return Err(invalid());
    }
    let port = match port {
        Some(port) => port
            .trim()
            .parse::<u16>()
            .map_err(|err| ValidationError::InvalidPort {
                value: value.to_owned(),
                source: err,
            })?,
        None => default_port,
    };
    Ok((host.to_owned(), port))
}

/// Joins host and port into a connectable address.
#[must_use]
pub fn socket_address(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}
