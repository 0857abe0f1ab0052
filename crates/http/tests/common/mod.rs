//! Common test utilities for lro-http

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use lro_poller::BoxError;
use lro_http::{HttpPipeline, HttpRequest, HttpResponse};
use parking_lot::Mutex;

/// Pipeline that replays scripted responses in order and records every
/// request it was asked to send.
#[derive(Default)]
pub struct ScriptedPipeline {
    responses: Mutex<VecDeque<HttpResponse>>,
    requests: Mutex<Vec<(Method, String)>>,
}

impl ScriptedPipeline {
    pub fn new(responses: Vec<HttpResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// `(method, uri)` of every request sent so far
    pub fn requests(&self) -> Vec<(Method, String)> {
        self.requests.lock().clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().len()
    }
}

#[async_trait]
impl HttpPipeline for ScriptedPipeline {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, BoxError> {
        self.requests
            .lock()
            .push((request.method().clone(), request.uri().to_string()));
        self.responses
            .lock()
            .pop_front()
            .ok_or_else(|| format!("no scripted response for {}", request.uri()).into())
    }
}

/// Build a response with the given status, headers and body
pub fn reply(status: u16, headers: &[(&str, &str)], body: &str) -> HttpResponse {
    let mut builder = http::Response::builder().status(status);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Bytes::from(body.to_owned())).unwrap()
}
