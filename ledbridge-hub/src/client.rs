//! Webhook trigger
//!
//! The phone and automation side of the bridge: one GET against a bridge
//! endpoint, success meaning a 2xx answer.

use http_body_util::BodyExt;
use ledbridge_proto::Envelope;

#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("webhook URL is empty, no request sent")]
    EmptyUrl,
    #[error("invalid webhook URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        source: hyper::http::uri::InvalidUri,
    },
    #[error("request failed: {0}")]
    Request(#[from] hyper_util::client::legacy::Error),
    #[error("failed to read response body: {0}")]
    Body(#[from] hyper::Error),
}

#[derive(Debug)]
pub struct TriggerOutcome {
    pub status: hyper::StatusCode,
    /// `None` when the body was not a bridge envelope
    pub envelope: Option<Envelope>,
}

impl TriggerOutcome {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

pub async fn trigger(url: &str) -> Result<TriggerOutcome, TriggerError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(TriggerError::EmptyUrl);
    }
    let uri: hyper::Uri = url.parse().map_err(|source| TriggerError::InvalidUrl {
        url: url.to_string(),
        source,
    })?;

    let client = hyper_util::client::legacy::Client::builder(
        hyper_util::rt::TokioExecutor::new(),
    )
    .build_http::<http_body_util::Empty<hyper::body::Bytes>>();

    tracing::debug!(%uri, "triggering webhook");
    let response = client.get(uri).await?;
    let status = response.status();
    let body = response.into_body().collect().await?.to_bytes();
    tracing::debug!(status = status.as_u16(), "webhook answered");

    Ok(TriggerOutcome {
        status,
        envelope: serde_json::from_slice(&body).ok(),
    })
}

#[cfg(test)]
mod tests {
    #[tokio::test]
    async fn empty_url_sends_nothing() {
        assert!(matches!(
            super::trigger("   ").await,
            Err(super::TriggerError::EmptyUrl)
        ));
    }

    #[tokio::test]
    async fn invalid_url() {
        assert!(matches!(
            super::trigger("http://exa mple/ac").await,
            Err(super::TriggerError::InvalidUrl { .. })
        ));
    }
}
