//! The I/O seam between resource clients and the network.
//!
//! # Design
//! `Transport::execute` takes an `HttpRequest` and hands back the response as
//! data whatever its status; status interpretation stays in the resource
//! client. Only failures that produce no response at all (DNS, refused
//! connection, TLS) come back as `Err(ClientError::Network)`.
//!
//! `UreqTransport` is the default blocking implementation. Tests substitute
//! their own implementations to record or script exchanges.

use ureq::typestate::WithBody;
use ureq::{Agent, RequestBuilder};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::http::{Body, HttpMethod, HttpRequest, HttpResponse, JSON_API};

/// Executes one HTTP exchange.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ClientError>;
}

/// Blocking transport bound to one site API endpoint and credential.
pub struct UreqTransport {
    agent: Agent,
    base_url: String,
    /// Standard site API headers followed by caller-supplied extras.
    site_headers: Vec<(String, String)>,
}

impl UreqTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;

        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();

        let mut site_headers = vec![
            ("Authorization".to_string(), format!("Bearer {}", config.api_token)),
            ("Accept".to_string(), JSON_API.to_string()),
            ("Content-Type".to_string(), JSON_API.to_string()),
            ("X-Api-Version".to_string(), "3".to_string()),
        ];
        site_headers.extend(config.extra_headers.iter().cloned());

        Ok(Self {
            agent,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            site_headers,
        })
    }

    fn url(&self, request: &HttpRequest) -> String {
        if request.is_absolute() {
            request.path.clone()
        } else {
            format!("{}{}", self.base_url, request.path)
        }
    }

    /// Presigned storage URLs must not see the site credential.
    fn decorate<B>(&self, mut builder: RequestBuilder<B>, request: &HttpRequest) -> RequestBuilder<B> {
        if !request.is_absolute() {
            for (name, value) in &self.site_headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        for (key, value) in &request.query {
            builder = builder.query(key.as_str(), value.as_str());
        }
        builder
    }
}

fn send(
    builder: RequestBuilder<WithBody>,
    body: Option<&Body>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(Body::Json(text)) => builder.send(text.as_bytes()),
        Some(Body::Binary { content_type, bytes }) => {
            builder.content_type(content_type.as_str()).send(bytes.as_slice())
        }
        None => builder.send_empty(),
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ClientError> {
        let url = self.url(request);
        let body = request.body.as_ref();

        let result = match request.method {
            HttpMethod::Get => self.decorate(self.agent.get(url.as_str()), request).call(),
            HttpMethod::Delete => self.decorate(self.agent.delete(url.as_str()), request).call(),
            HttpMethod::Post => send(self.decorate(self.agent.post(url.as_str()), request), body),
            HttpMethod::Put => send(self.decorate(self.agent.put(url.as_str()), request), body),
        };
        let mut response = result.map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        // no size cap: listings are unpaginated
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
