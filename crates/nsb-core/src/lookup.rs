use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;

use crate::{
    domain::{ChatId, UserId},
    errors::Error,
    gate::{AccessGate, Denial},
    normalize::{normalize, Record},
    ports::LookupApi,
    store::UserGateway,
    Result,
};

/// Upstream client: one HTTP GET per search, the term templated into the
/// configured URL. Timeouts are treated like any other failure by the
/// caller; nothing is retried.
pub struct HttpLookupApi {
    client: reqwest::Client,
    url_template: String,
}

impl HttpLookupApi {
    pub fn new(
        url_template: String,
        connect_timeout: Duration,
        total_timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(total_timeout)
            .build()
            .map_err(|e| Error::Upstream(format!("client build failed: {e}")))?;

        Ok(Self {
            client,
            url_template,
        })
    }
}

#[async_trait]
impl LookupApi for HttpLookupApi {
    async fn fetch_raw(&self, term: &str) -> Result<String> {
        let url = self.url_template.replace("{term}", term);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("lookup request failed: {e}")))?;

        response
            .text()
            .await
            .map_err(|e| Error::Upstream(format!("lookup body read failed: {e}")))
    }
}

/// What the transport should render for a search request.
#[derive(Clone, Debug, PartialEq)]
pub enum SearchReply {
    InvalidTerm,
    Denied(Denial),
    Found(Vec<Record>),
    UpstreamDown,
    Unrecognized,
}

/// The full gated search pipeline: validate → admit → fetch → normalize →
/// account. Infallible by design: every failure mode maps to a reply the
/// transport renders, so a single request can never take the handler down.
pub struct LookupService {
    gateway: Arc<UserGateway>,
    gate: Arc<AccessGate>,
    api: Arc<dyn LookupApi>,
}

impl LookupService {
    pub fn new(gateway: Arc<UserGateway>, gate: Arc<AccessGate>, api: Arc<dyn LookupApi>) -> Self {
        Self { gateway, gate, api }
    }

    pub async fn search(
        &self,
        id: UserId,
        display_name: Option<String>,
        handle: Option<String>,
        chat: ChatId,
        term: &str,
    ) -> SearchReply {
        let term = term.trim();
        // Validation happens before any record is touched.
        if term.is_empty() || !term.chars().all(|c| c.is_ascii_digit()) {
            return SearchReply::InvalidTerm;
        }

        let mut record = self.gate.ensure_user(id, display_name, handle).await;
        if let Err(denial) = self.gate.admit_lookup(&mut record, chat).await {
            return SearchReply::Denied(denial);
        }

        let raw = match self.api.fetch_raw(term).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("upstream lookup failed for user {}: {e}", id.0);
                return SearchReply::UpstreamDown;
            }
        };

        let records = match normalize(&raw) {
            Ok(records) => records,
            Err(e) => {
                warn!("lookup response rejected for user {}: {e}", id.0);
                return SearchReply::Unrecognized;
            }
        };

        record.record_search(Utc::now());
        self.gateway.save(record).await;

        SearchReply::Found(records)
    }
}
