//! Response types for Tjall Router
//!
//! Callbacks do not return a response. They receive a [`Response`] handle and
//! write to it; the router owns another handle to the same state and
//! finalizes it with [`Response::end`] once the dispatch is over.
//!
//! | Method | Effect |
//! |--------|--------|
//! | [`Response::status`] | set the status code (default 200) |
//! | [`Response::header`] | add a response header |
//! | [`Response::send_json`] | serialize a body, `application/json` |
//! | [`Response::send_text`] | plain text body, `text/plain; charset=utf-8` |
//! | [`Response::end`] | produce the final `http::Response`, once |
//!
//! A body can be sent only once per response; a second send fails with
//! [`RouterError::AlreadySent`].

use crate::error::{Result, RouterError};
use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use http_body_util::Full;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Finalized HTTP response
pub type HttpResponse = http::Response<Full<Bytes>>;

#[derive(Debug, Default)]
struct ResponseState {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Bytes>,
    ended: bool,
}

/// Shared handle to the response being built for the current request
#[derive(Debug, Clone, Default)]
pub struct Response {
    state: Arc<Mutex<ResponseState>>,
}

impl Response {
    /// Create an empty 200 response
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ResponseState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the status code
    pub fn status(&self, status: StatusCode) -> &Self {
        self.state().status = status;
        self
    }

    /// Current status code
    pub fn current_status(&self) -> StatusCode {
        self.state().status
    }

    /// Append a header
    pub fn header(&self, name: HeaderName, value: HeaderValue) -> &Self {
        self.state().headers.append(name, value);
        self
    }

    /// Whether a body has been sent
    pub fn is_sent(&self) -> bool {
        self.state().body.is_some()
    }

    /// Send a JSON body
    pub fn send_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let body = serde_json::to_vec(value).map_err(RouterError::dispatch)?;
        self.send(Bytes::from(body), HeaderValue::from_static("application/json"))
    }

    /// Send a plain text body
    pub fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.send(
            Bytes::from(text.into()),
            HeaderValue::from_static("text/plain; charset=utf-8"),
        )
    }

    fn send(&self, body: Bytes, content_type: HeaderValue) -> Result<()> {
        let mut state = self.state();
        if state.ended {
            return Err(RouterError::AlreadyEnded);
        }
        if state.body.is_some() {
            return Err(RouterError::AlreadySent);
        }
        state.headers.insert(header::CONTENT_TYPE, content_type);
        state.body = Some(body);
        Ok(())
    }

    /// Drop whatever was written so far, keeping the handle usable
    pub(crate) fn reset(&self) {
        let mut state = self.state();
        if !state.ended {
            *state = ResponseState::default();
        }
    }

    /// Finalize the response. Succeeds exactly once per response.
    pub fn end(&self) -> Result<HttpResponse> {
        let mut state = self.state();
        if state.ended {
            return Err(RouterError::AlreadyEnded);
        }
        state.ended = true;

        let mut response = http::Response::new(Full::new(state.body.take().unwrap_or_default()));
        *response.status_mut() = state.status;
        *response.headers_mut() = std::mem::take(&mut state.headers);
        Ok(response)
    }
}
