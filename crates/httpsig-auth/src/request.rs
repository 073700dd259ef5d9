//! Order-preserving snapshot of an inbound request.

use chrono::{DateTime, Utc};
use http::Version;
use http::request::Parts;

use crate::error::AuthError;

/// The request fields a signing string can cover.
///
/// Header names are lower-cased; values are kept as raw bytes in arrival
/// order, so obs-text values survive capture untouched. Repeated headers
/// share one entry and are joined with `", "` when read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContent {
    method: String,
    path: String,
    protocol: String,
    headers: Vec<(String, Vec<Vec<u8>>)>,
}

impl RequestContent {
    /// Start building request content for `method` and `path` (the request
    /// target including any query string).
    #[must_use]
    pub fn builder(method: impl Into<String>, path: impl Into<String>) -> RequestContentBuilder {
        RequestContentBuilder {
            content: Self {
                method: method.into(),
                path: path.into(),
                protocol: "HTTP/1.1".to_owned(),
                headers: Vec::new(),
            },
        }
    }

    /// Capture the request line and headers of an `http` request.
    #[must_use]
    pub fn from_parts(parts: &Parts) -> Self {
        let path = parts
            .uri
            .path_and_query()
            .map_or("/", http::uri::PathAndQuery::as_str);
        let mut builder = Self::builder(parts.method.as_str(), path).protocol(protocol_name(parts.version));
        for (name, value) in &parts.headers {
            builder = builder.header(name.as_str(), value.as_bytes());
        }
        builder.build()
    }

    /// Request method as received.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request target (path and query).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Protocol version string, e.g. `HTTP/1.1`.
    #[must_use]
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// All values of a header, in arrival order.
    #[must_use]
    pub fn header_values(&self, name: &str) -> Option<&[Vec<u8>]> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
    }

    /// The raw value of a header, multiple values joined with `", "`.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<Vec<u8>> {
        self.header_values(name).map(|values| values.join(&b", "[..]))
    }

    /// Header names in arrival order.
    pub fn header_names(&self) -> impl Iterator<Item = &str> {
        self.headers.iter().map(|(name, _)| name.as_str())
    }

    /// The parsed `date` header, if present.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidDate`] if the header is not an RFC 2822
    /// / IMF-fixdate timestamp.
    pub fn date(&self) -> Result<Option<DateTime<Utc>>, AuthError> {
        self.header("date")
            .map(|raw| {
                let invalid = || AuthError::InvalidDate(String::from_utf8_lossy(&raw).into_owned());
                let text = std::str::from_utf8(&raw).map_err(|_| invalid())?;
                DateTime::parse_from_rfc2822(text.trim())
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|_| invalid())
            })
            .transpose()
    }
}

/// Builder for [`RequestContent`].
#[derive(Debug)]
pub struct RequestContentBuilder {
    content: RequestContent,
}

impl RequestContentBuilder {
    /// Set the protocol version string.
    #[must_use]
    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.content.protocol = protocol.into();
        self
    }

    /// Append a header value.
    #[must_use]
    pub fn header(mut self, name: &str, value: impl AsRef<[u8]>) -> Self {
        let name = name.to_ascii_lowercase();
        let value = value.as_ref().to_vec();
        match self.content.headers.iter_mut().find(|(n, _)| *n == name) {
            Some((_, values)) => values.push(value),
            None => self.content.headers.push((name, vec![value])),
        }
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> RequestContent {
        self.content
    }
}

fn protocol_name(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}

/// Format a timestamp as an HTTP `date` header value.
#[must_use]
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
