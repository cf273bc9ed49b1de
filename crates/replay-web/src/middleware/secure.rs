use crate::body::ReqBody;
use crate::decorator::Decorator;
use crate::handler::{HandlerResult, RequestHandler};
use crate::responder::into_response;
use async_trait::async_trait;
use http::header::{
    CONTENT_SECURITY_POLICY, STRICT_TRANSPORT_SECURITY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS, X_XSS_PROTECTION,
};
use http::{HeaderName, HeaderValue, Request};

const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Protection headers added to every response. `None` leaves a header out.
#[derive(Debug, Clone)]
pub struct SecureHeaders {
    pub xss_protection: Option<HeaderValue>,
    pub content_type_nosniff: Option<HeaderValue>,
    pub x_frame_options: Option<HeaderValue>,
    pub content_security_policy: Option<HeaderValue>,
    /// `max-age` of `Strict-Transport-Security`, only sent for requests forwarded over https.
    pub hsts_max_age: Option<u64>,
}

impl Default for SecureHeaders {
    fn default() -> Self {
        Self {
            xss_protection: Some(HeaderValue::from_static("1; mode=block")),
            content_type_nosniff: Some(HeaderValue::from_static("nosniff")),
            x_frame_options: Some(HeaderValue::from_static("SAMEORIGIN")),
            content_security_policy: None,
            hsts_max_age: None,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct SecureHeadersDecorator {
    config: SecureHeaders,
}

impl SecureHeadersDecorator {
    pub fn new(config: SecureHeaders) -> Self {
        Self { config }
    }
}

#[derive(Debug)]
pub struct SecureHeadersHandler<H> {
    handler: H,
    config: SecureHeaders,
}

impl<H: RequestHandler> Decorator<H> for SecureHeadersDecorator {
    type Out = SecureHeadersHandler<H>;

    fn decorate(&self, raw: H) -> Self::Out {
        SecureHeadersHandler { handler: raw, config: self.config.clone() }
    }
}

#[async_trait]
impl<H: RequestHandler> RequestHandler for SecureHeadersHandler<H> {
    async fn invoke(&self, req: Request<ReqBody>) -> HandlerResult {
        let forwarded_https = req.headers().get(X_FORWARDED_PROTO).is_some_and(|proto| proto == "https");

        let mut response = into_response(self.handler.invoke(req).await);

        let config = &self.config;
        let headers = response.headers_mut();
        let static_headers = [
            (X_XSS_PROTECTION, &config.xss_protection),
            (X_CONTENT_TYPE_OPTIONS, &config.content_type_nosniff),
            (X_FRAME_OPTIONS, &config.x_frame_options),
            (CONTENT_SECURITY_POLICY, &config.content_security_policy),
        ];
        for (name, value) in static_headers {
            if let Some(value) = value {
                headers.insert(name, value.clone());
            }
        }

        if let Some(max_age) = config.hsts_max_age.filter(|_| forwarded_https) {
            if let Ok(value) = HeaderValue::try_from(format!("max-age={max_age}; includeSubdomains")) {
                headers.insert(STRICT_TRANSPORT_SECURITY, value);
            }
        }

        Ok(response)
    }
}
