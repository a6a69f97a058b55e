use std::sync::Arc;

use tracing::warn;
use url::Url;

use crate::error::{AppError, AppResult, ConfigError, HttpError};

use super::source::{HttpMethod, RequestDescription, RequestSource};

/// Parsed request script: an ordered list of calls.
///
/// One call per line, formatted as `[METHOD] <url> [body]`. The method tag is
/// optional and defaults to GET. Blank lines and lines starting with `#` or
/// `--` are ignored.
#[derive(Debug, Clone)]
pub struct CallScript {
    calls: Arc<[RequestDescription]>,
}

impl CallScript {
    /// # Errors
    ///
    /// Returns an error when a line holds an invalid URL or no calls remain.
    pub fn parse<'line, I>(lines: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = &'line str>,
    {
        let mut calls = Vec::new();
        for line in lines {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("--") {
                continue;
            }
            calls.push(parse_call(trimmed)?);
        }
        if calls.is_empty() {
            return Err(AppError::config(ConfigError::ScriptEmpty));
        }
        Ok(Self {
            calls: calls.into(),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Creates a fresh source positioned before the first call.
    #[must_use]
    pub fn source(&self) -> CallListSource {
        CallListSource {
            calls: Arc::clone(&self.calls),
            current_call: 0,
        }
    }

    /// Creates `count` independent sources for a worker pool.
    #[must_use]
    pub fn sources(&self, count: usize) -> Vec<Box<dyn RequestSource>> {
        (0..count)
            .map(|_| Box::new(self.source()) as Box<dyn RequestSource>)
            .collect()
    }
}

fn split_method_tag(line: &str) -> (HttpMethod, &str) {
    let Some((tag, rest)) = line
        .strip_prefix('[')
        .and_then(|tagged| tagged.split_once(']'))
    else {
        return (HttpMethod::Get, line);
    };
    let method = HttpMethod::from_tag(tag.trim()).unwrap_or_else(|| {
        warn!("Unknown method tag '[{}]', using GET", tag);
        HttpMethod::Get
    });
    (method, rest.trim_start())
}

fn parse_call(line: &str) -> AppResult<RequestDescription> {
    let (method, rest) = split_method_tag(line);

    let (url, body) = rest.split_once(char::is_whitespace).map_or((rest, None), |(url, body)| {
        let body = body.trim();
        (url, (!body.is_empty()).then(|| body.to_owned()))
    });

    Url::parse(url).map_err(|err| {
        AppError::http(HttpError::InvalidUrl {
            url: url.to_owned(),
            source: err,
        })
    })?;

    Ok(RequestDescription {
        method,
        url: url.to_owned(),
        body,
    })
}

/// Walks the calls of a [`CallScript`] in order, restarting after the last one.
#[derive(Debug, Clone)]
pub struct CallListSource {
    calls: Arc<[RequestDescription]>,
    /// One-based number of the call issued last; zero before the first call.
    current_call: usize,
}

impl CallListSource {
    #[must_use]
    pub const fn current_call(&self) -> usize {
        self.current_call
    }
}

impl RequestSource for CallListSource {
    fn next_request(&mut self) -> RequestDescription {
        self.current_call = self.current_call.saturating_add(1);
        if self.current_call > self.calls.len() {
            self.current_call = 1;
        }
        self.calls
            .get(self.current_call.saturating_sub(1))
            .cloned()
            .unwrap_or_else(|| RequestDescription::get(String::new()))
    }

    fn revert_last_call(&mut self) {
        self.current_call = self.current_call.saturating_sub(1);
    }
}
