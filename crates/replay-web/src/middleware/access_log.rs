use crate::body::ReqBody;
use crate::decorator::Decorator;
use crate::handler::{HandlerResult, RequestHandler};
use crate::middleware::X_REQUEST_ID;
use crate::server::RemoteAddr;
use async_trait::async_trait;
use http::{HeaderMap, Method, Request};
use serde::Serialize;
use std::time::{Duration, Instant};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::info;

/// Decides whether a request is left out of the access log.
pub type Skipper = fn(&Request<ReqBody>) -> bool;

/// Writes one JSON line per request under the `access` target.
#[derive(Debug, Clone, Copy)]
pub struct AccessLogDecorator {
    skipper: Skipper,
}

impl AccessLogDecorator {
    pub fn new() -> Self {
        Self { skipper: skip_health_and_preflight }
    }

    pub fn with_skipper(skipper: Skipper) -> Self {
        Self { skipper }
    }
}

impl Default for AccessLogDecorator {
    fn default() -> Self {
        Self::new()
    }
}

fn skip_health_and_preflight(req: &Request<ReqBody>) -> bool {
    req.uri().path() == "/healthcheck" || req.method() == Method::OPTIONS
}

#[derive(Debug)]
pub struct AccessLogHandler<H> {
    skipper: Skipper,
    handler: H,
}

impl<H: RequestHandler> Decorator<H> for AccessLogDecorator {
    type Out = AccessLogHandler<H>;

    fn decorate(&self, raw: H) -> Self::Out {
        AccessLogHandler { skipper: self.skipper, handler: raw }
    }
}

#[derive(Debug, Serialize)]
struct AccessRecord {
    level: &'static str,
    data: AccessData,
    #[serde(rename = "type")]
    kind: &'static str,
    time: String,
}

#[derive(Debug, Serialize)]
struct AccessData {
    remote_ip: String,
    method: String,
    uri: String,
    status: u16,
    latency: u128,
    latency_human: String,
    #[serde(rename = "requestId")]
    request_id: String,
}

#[async_trait]
impl<H: RequestHandler> RequestHandler for AccessLogHandler<H> {
    async fn invoke(&self, req: Request<ReqBody>) -> HandlerResult {
        if (self.skipper)(&req) {
            return self.handler.invoke(req).await;
        }

        let remote_ip = remote_ip(&req);
        let method = req.method().to_string();
        let uri = req.uri().to_string();
        let request_id = req.headers().get(X_REQUEST_ID).and_then(|id| id.to_str().ok()).unwrap_or_default().to_owned();

        let start = Instant::now();
        let result = self.handler.invoke(req).await;
        let latency = start.elapsed();

        let status = match &result {
            Ok(response) => response.status(),
            Err(e) => e.status(),
        };

        let record = AccessRecord {
            level: "info",
            data: AccessData {
                remote_ip,
                method,
                uri,
                status: status.as_u16(),
                latency: latency.as_nanos(),
                latency_human: latency_human(latency),
                request_id,
            },
            kind: "access",
            time: OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
        };

        match serde_json::to_string(&record) {
            Ok(line) => info!(target: "access", "{line}"),
            Err(e) => info!(target: "access", cause = %e, "access record could not be serialized"),
        }

        result
    }
}

/// First `X-Forwarded-For` hop, then `X-Real-IP`, then the peer address.
fn remote_ip(req: &Request<ReqBody>) -> String {
    forwarded_ip(req.headers())
        .or_else(|| req.extensions().get::<RemoteAddr>().map(|addr| addr.ip().to_string()))
        .unwrap_or_default()
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
    };

    forwarded.or_else(real_ip).map(str::to_owned)
}

fn latency_human(latency: Duration) -> String {
    format!("{latency:?}")
}
