//! Delivery of record batches to the ingest endpoint.
//!
//! The endpoint is opaque to the pipeline: a batch goes in, success or
//! failure comes out. [`Sink`] is the seam; [`HttpSink`] is the production
//! implementation speaking HTTP POST against `<target>/api/logs`, where a 201
//! response acknowledges one record.

use async_trait::async_trait;
use bytes::Bytes;
use http::{
    Method, StatusCode, Uri,
    header::{CONTENT_LENGTH, CONTENT_TYPE},
    uri::PathAndQuery,
};
use http_body_util::Full;
use hyper::Request;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};

use logspray_payload::LogRecord;

const INGEST_PATH: &str = "/api/logs";

/// Errors produced by [`Sink`] implementations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A record could not be serialized for the wire.
    #[error("record could not be encoded: {0}")]
    Json(#[from] serde_json::Error),
    /// The ingest URI could not be assembled from the target URI.
    #[error("invalid ingest URI: {0}")]
    Uri(#[from] http::uri::InvalidUriParts),
    /// A request could not be constructed.
    #[error("HTTP error: {0}")]
    Http(#[from] http::Error),
    /// The request could not be transmitted.
    #[error("failed to send request to {uri}: {source}")]
    RequestFailed {
        /// Target URI.
        uri: String,
        /// Underlying client error.
        #[source]
        source: hyper_util::client::legacy::Error,
    },
    /// The endpoint answered with something other than 201.
    #[error("unexpected status code: {status}")]
    UnexpectedStatus {
        /// The status the endpoint answered with.
        status: StatusCode,
    },
}

#[async_trait]
/// Accepts batches of records for delivery.
pub trait Sink: Send + Sync {
    /// Deliver one batch. Success means every record in the batch was
    /// accepted; on failure the caller discards the batch, there is no
    /// partial-success accounting and no retry.
    async fn deliver(&self, batch: &[LogRecord]) -> Result<(), Error>;
}

/// Production [`Sink`] delivering records over HTTP.
#[derive(Debug)]
pub struct HttpSink {
    client: Client<HttpConnector, Full<Bytes>>,
    uri: Uri,
}

impl HttpSink {
    /// Create a new [`HttpSink`] POSTing to `<target>/api/logs`.
    ///
    /// # Errors
    ///
    /// Returns an error if `target` lacks the scheme or authority needed to
    /// form an absolute ingest URI.
    pub fn new(target: &Uri) -> Result<Self, Error> {
        let mut parts = target.clone().into_parts();
        parts.path_and_query = Some(PathAndQuery::from_static(INGEST_PATH));
        let uri = Uri::from_parts(parts)?;

        let client = Client::builder(TokioExecutor::new())
            .retry_canceled_requests(false)
            .build_http();

        Ok(Self { client, uri })
    }
}

#[async_trait]
impl Sink for HttpSink {
    async fn deliver(&self, batch: &[LogRecord]) -> Result<(), Error> {
        // The ingest endpoint accepts one JSON record per request, so a
        // multi-record batch becomes a sequence of POSTs. The batch succeeds
        // only if every record is accepted.
        for record in batch {
            let body = serde_json::to_vec(record)?;
            let request = Request::builder()
                .method(Method::POST)
                .uri(self.uri.clone())
                .header(CONTENT_TYPE, "application/json")
                .header(CONTENT_LENGTH, body.len())
                .body(Full::new(Bytes::from(body)))?;

            let response =
                self.client
                    .request(request)
                    .await
                    .map_err(|source| Error::RequestFailed {
                        uri: self.uri.to_string(),
                        source,
                    })?;

            let status = response.status();
            if status != StatusCode::CREATED {
                return Err(Error::UnexpectedStatus { status });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use http::Uri;

    use super::HttpSink;

    #[test]
    fn ingest_path_is_appended_to_target() {
        let sink = HttpSink::new(&Uri::from_static("http://localhost:8080"))
            .expect("absolute target URI");
        assert_eq!(sink.uri.to_string(), "http://localhost:8080/api/logs");
    }

    #[test]
    fn target_path_is_replaced_not_joined() {
        let sink = HttpSink::new(&Uri::from_static("http://localhost:8080/ignored"))
            .expect("absolute target URI");
        assert_eq!(sink.uri.to_string(), "http://localhost:8080/api/logs");
    }
}
