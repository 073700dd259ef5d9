//! Gateway service that authenticates every request with HTTP Signatures.
//!
//! Health-check endpoints (`/_health`, `/health`) are answered directly. Any
//! other request is run through a fresh login module against the current
//! configuration snapshot: on success the response names the authenticated
//! user, otherwise it is a `401` carrying the challenge. The failure kind is
//! logged but never returned to the client.

use std::convert::Infallible;
use std::future::{Ready, ready};
use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, WWW_AUTHENTICATE};
use http::{HeaderValue, StatusCode};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::Service;
use httpsig_login::{HttpsigConfiguration, Subject};
use tracing::{debug, info, warn};

/// Response body type.
pub type GatewayBody = Full<Bytes>;

const REQUEST_ID: &str = "x-request-id";

/// Authenticating gateway over a shared configuration.
#[derive(Debug, Clone)]
pub struct GatewayService {
    configuration: Arc<HttpsigConfiguration>,
}

impl GatewayService {
    /// Create a gateway reading from `configuration` on every request.
    pub fn new(configuration: Arc<HttpsigConfiguration>) -> Self {
        Self { configuration }
    }

    /// Handle one request. The body is ignored.
    pub fn handle<B>(&self, req: http::Request<B>) -> http::Response<GatewayBody> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let snapshot = self.configuration.snapshot();

        if is_health_check(req.method(), req.uri().path()) {
            let body = serde_json::json!({
                "status": "running",
                "keys": snapshot.verifier().keychain().len(),
            });
            return json_response(StatusCode::OK, &body, &request_id);
        }

        let (parts, _body) = req.into_parts();
        let mut module = snapshot.login_module();
        let credentials = match snapshot.credentials_from_parts(&parts) {
            Ok(credentials) => Some(credentials),
            Err(e) => {
                debug!(request_id = %request_id, error = %e, "no usable HTTP signature credentials");
                None
            }
        };

        let mut subject = Subject::new();
        let authenticated = module.login(credentials).unwrap_or(false) && module.commit(&mut subject);
        match subject.auth_info() {
            Some(auth_info) if authenticated => {
                info!(
                    request_id = %request_id,
                    method = %parts.method,
                    path = %parts.uri.path(),
                    user = %auth_info.user_id(),
                    "request authenticated"
                );
                let body = serde_json::json!({ "user": auth_info.user_id() });
                json_response(StatusCode::OK, &body, &request_id)
            }
            _ => {
                debug!(request_id = %request_id, state = ?module.state(), "request rejected");
                let mut resp = json_response(
                    StatusCode::UNAUTHORIZED,
                    &serde_json::json!({ "error": "authentication failed" }),
                    &request_id,
                );
                match HeaderValue::from_str(&snapshot.challenge().to_header_value()) {
                    Ok(value) => {
                        resp.headers_mut().insert(WWW_AUTHENTICATE, value);
                    }
                    Err(e) => warn!(error = %e, "challenge is not a valid header value"),
                }
                resp
            }
        }
    }
}

impl Service<http::Request<Incoming>> for GatewayService {
    type Response = http::Response<GatewayBody>;
    type Error = Infallible;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        ready(Ok(self.handle(req)))
    }
}

/// Check if the request is a health check probe.
fn is_health_check(method: &http::Method, path: &str) -> bool {
    *method == http::Method::GET && (path == "/_health" || path == "/health")
}

fn json_response(status: StatusCode, body: &serde_json::Value, request_id: &str) -> http::Response<GatewayBody> {
    let mut resp = http::Response::new(Full::new(Bytes::from(body.to_string())));
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(value) = HeaderValue::from_str(request_id) {
        resp.headers_mut().insert(REQUEST_ID, value);
    }
    resp
}
