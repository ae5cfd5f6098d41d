use std::fmt;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::future::BoxFuture;
use headers::{Authorization, HeaderMapExt};
use http::header::{
    ACCEPT_ENCODING, AUTHORIZATION, COOKIE, PROXY_AUTHORIZATION, SET_COOKIE, USER_AGENT,
};
use http::{HeaderMap, Request, Response, header::HeaderValue};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper_rustls::{ConfigBuilderExt, HttpsConnector};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use rustls::ClientConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Failed to load native root certificates: {0}")]
    NativeCerts(std::io::Error),
    #[error("Failed to make HTTP(S) request: {0}")]
    CallRequest(#[from] hyper_util::client::legacy::Error),
    #[error("Failed to reading response: {0}")]
    ReadIncoming(#[from] hyper::Error),
    #[error("Failed to build HTTP request: {0}")]
    BuildRequest(#[from] http::Error),
    #[error("HTTP request timed out after {0:?}")]
    Timeout(Duration),
}

/// A pooled HTTP(S) client. Clones share the connection pool, so one client
/// can serve every collector task concurrently.
#[derive(Clone)]
pub struct HttpClient {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    user_agent: HeaderValue,
    auth: Option<Auth>,
    timeout: Option<Duration>,
}

impl HttpClient {
    /// Without `timeout` a request waits for the server forever.
    pub fn new(timeout: Option<Duration>) -> Result<HttpClient, HttpError> {
        let mut http = HttpConnector::new();
        http.enforce_http(false);

        let tls = ClientConfig::builder()
            .with_native_roots()
            .map_err(HttpError::NativeCerts)?
            .with_no_client_auth();
        let https = HttpsConnector::from((http, tls));

        let client = Client::builder(TokioExecutor::new()).build(https);
        let user_agent =
            HeaderValue::from_static(concat!("vts-collector/", env!("CARGO_PKG_VERSION")));

        Ok(HttpClient {
            client,
            user_agent,
            auth: None,
            timeout,
        })
    }

    /// A client sharing this one's pool, which authenticates every request
    /// with `auth`.
    pub fn with_auth(&self, auth: Option<Auth>) -> HttpClient {
        HttpClient {
            auth,
            ..self.clone()
        }
    }

    pub fn send(
        &self,
        mut req: Request<Full<Bytes>>,
    ) -> BoxFuture<'static, Result<Response<Incoming>, HttpError>> {
        default_request_headers(&mut req, &self.user_agent);
        if let Some(auth) = &self.auth {
            auth.apply(&mut req);
        }

        let uri = req.uri().clone();
        let timeout = self.timeout;
        let resp = self.client.request(req);

        Box::pin(async move {
            // Request doesn't start the processing until we start polling it.
            let before = Instant::now();

            let resp = match timeout {
                Some(timeout) => tokio::time::timeout(timeout, resp)
                    .await
                    .map_err(|_elapsed| HttpError::Timeout(timeout))??,
                None => resp.await?,
            };

            debug!(
                message = "HTTP response received",
                %uri,
                status = %resp.status(),
                version = ?resp.version(),
                headers = ?remove_sensitive(resp.headers()),
                elapsed = ?before.elapsed(),
            );

            Ok(resp)
        })
    }
}

fn default_request_headers<B>(request: &mut Request<B>, user_agent: &HeaderValue) {
    if !request.headers().contains_key(USER_AGENT) {
        request.headers_mut().insert(USER_AGENT, user_agent.clone());
    }

    if !request.headers().contains_key(ACCEPT_ENCODING) {
        // compressed responses are not supported
        request
            .headers_mut()
            .insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
    }
}

fn remove_sensitive(headers: &HeaderMap<HeaderValue>) -> HeaderMap<HeaderValue> {
    let mut headers = headers.clone();
    for name in &[AUTHORIZATION, PROXY_AUTHORIZATION, COOKIE, SET_COOKIE] {
        if let Some(value) = headers.get_mut(name) {
            value.set_sensitive(true);
        }
    }

    headers
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("user_agent", &self.user_agent)
            .field("auth", &self.auth.as_ref().map(Auth::strategy))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// The authentication strategy for http request/response
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "snake_case", tag = "strategy")]
pub enum Auth {
    /// Basic authentication.
    ///
    /// The username and password are concatenated and encoded via [base64][base64].
    ///
    /// [base64]: https://en.wikipedia.org/wiki/Base64
    Basic { user: String, password: String },

    /// Bearer authentication.
    ///
    /// The bearer token value (OAuth2, JWT, etc) is passed as-is.
    Bearer { token: String },
}

impl Auth {
    pub fn basic(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            user: user.into(),
            password: password.into(),
        }
    }

    fn strategy(&self) -> &'static str {
        match self {
            Auth::Basic { .. } => "basic",
            Auth::Bearer { .. } => "bearer",
        }
    }

    /// Checks the credentials can be sent as an `Authorization` header.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Auth::Basic { .. } => Ok(()),
            Auth::Bearer { token } => Authorization::bearer(token)
                .map(|_| ())
                .map_err(|err| format!("invalid bearer token, {err}")),
        }
    }

    pub fn apply<B>(&self, req: &mut Request<B>) {
        self.apply_headers_map(req.headers_mut())
    }

    pub fn apply_headers_map(&self, map: &mut HeaderMap) {
        match &self {
            Auth::Basic { user, password } => {
                map.typed_insert(Authorization::basic(user, password));
            }
            Auth::Bearer { token } => match Authorization::bearer(token) {
                Ok(auth) => map.typed_insert(auth),
                Err(err) => error!(message = "Invalid bearer token", %err),
            },
        }
    }
}
