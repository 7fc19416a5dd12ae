// src/edgar/client.rs
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderValue};
use tokio_util::sync::CancellationToken;

use crate::edgar::models::{CompanyTicker, Firm};
use crate::edgar::throttle::RequestThrottle;
use crate::utils::error::EdgarError;

const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Anything that can turn a URL into bytes. The cache and index resolver only
/// see this seam, which keeps them testable without a network.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>, EdgarError>;
}

/// Base URLs for the EDGAR endpoints the pipeline touches.
#[derive(Debug, Clone)]
pub struct EdgarUrls {
    pub submissions_base: String,
    pub archives_base: String,
    pub company_tickers: String,
}

impl Default for EdgarUrls {
    fn default() -> Self {
        Self {
            submissions_base: "https://data.sec.gov/submissions".to_string(),
            archives_base: "https://www.sec.gov/Archives/edgar/data".to_string(),
            company_tickers: "https://www.sec.gov/files/company_tickers.json".to_string(),
        }
    }
}

impl EdgarUrls {
    /// `{submissions_base}/CIK##########.json`
    pub fn submissions_url(&self, cik10: &str) -> String {
        format!("{}/CIK{}.json", self.submissions_base.trim_end_matches('/'), cik10)
    }

    /// `{archives_base}/{cik without zeros}/{accession without dashes}/{primary document}`.
    /// EDGAR archive paths are literal, so the document name is not re-encoded.
    pub fn primary_doc_url(&self, cik_no_zeros: &str, accession_no_dashes: &str, primary_doc: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.archives_base.trim_end_matches('/'),
            cik_no_zeros,
            accession_no_dashes,
            primary_doc
        )
    }
}

/// Rate-limited HTTP client for EDGAR.
///
/// Every request carries the configured User-Agent (SEC rejects anonymous
/// traffic) and passes through the shared `RequestThrottle` first.
pub struct EdgarClient {
    http: reqwest::Client,
    throttle: Arc<RequestThrottle>,
}

impl EdgarClient {
    pub fn new(user_agent: &str, throttle: Arc<RequestThrottle>) -> Result<Self, EdgarError> {
        let user_agent = user_agent.trim();
        if user_agent.is_empty() {
            return Err(EdgarError::InvalidUserAgent("User-Agent must not be blank".to_string()));
        }
        let header_value = HeaderValue::from_str(user_agent)
            .map_err(|e| EdgarError::InvalidUserAgent(format!("{}: {}", user_agent, e)))?;

        let http = reqwest::Client::builder()
            .user_agent(header_value)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self { http, throttle })
    }

    async fn send(&self, url: &str) -> Result<Vec<u8>, EdgarError> {
        tracing::debug!("Requesting {}", url);

        let response = self
            .http
            .get(url)
            // Submissions are JSON, archives are mostly HTML
            .header(header::ACCEPT, "application/json,text/html,application/xml,text/plain,*/*")
            .send()
            .await?;

        // Check if the request was successful (status code 2xx)
        let status = response.status();
        if !status.is_success() {
            tracing::warn!("HTTP error status: {} for URL: {}", status, url);
            if status == reqwest::StatusCode::FORBIDDEN {
                return Err(EdgarError::RateLimited(url.to_string()));
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(EdgarError::FilingDocNotFound(url.to_string()));
            }
            return Err(EdgarError::Http {
                status,
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        tracing::debug!("Downloaded {} bytes from {}", body.len(), url);
        Ok(body.to_vec())
    }
}

#[async_trait]
impl DocumentSource for EdgarClient {
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>, EdgarError> {
        self.throttle.acquire(cancel).await?;
        until_cancelled(cancel, url, self.send(url)).await
    }
}

/// Drives an in-flight request unless `cancel` fires first; the request is dropped then.
async fn until_cancelled<T, F>(cancel: &CancellationToken, url: &str, request: F) -> Result<T, EdgarError>
where
    F: Future<Output = Result<T, EdgarError>>,
{
    tokio::select! {
        _ = cancel.cancelled() => {
            tracing::debug!("Request cancelled: {}", url);
            Err(EdgarError::Cancelled)
        }
        result = request => result,
    }
}

/// Resolves ticker symbols to firms using the SEC ticker map.
///
/// Tickers that are not in the map are logged and left out of the result.
pub async fn lookup_tickers<S>(
    source: &S,
    urls: &EdgarUrls,
    tickers: &[String],
    cancel: &CancellationToken,
) -> Result<Vec<Firm>, EdgarError>
where
    S: DocumentSource + ?Sized,
{
    if tickers.is_empty() {
        return Ok(Vec::new());
    }

    let bytes = source.fetch(&urls.company_tickers, cancel).await?;
    let table: HashMap<String, CompanyTicker> = serde_json::from_slice(&bytes)
        .map_err(|e| EdgarError::Parse(format!("company tickers: {}", e)))?;

    let by_ticker: HashMap<String, &CompanyTicker> = table
        .values()
        .map(|entry| (entry.ticker.to_uppercase(), entry))
        .collect();

    let mut firms = Vec::with_capacity(tickers.len());
    for ticker in tickers {
        let wanted = ticker.trim().to_uppercase();
        match by_ticker.get(&wanted) {
            Some(entry) => firms.push(Firm {
                // Format CIK with leading zeros to 10 digits
                cik10: format!("{:010}", entry.cik_str),
                ticker: Some(wanted),
                name: Some(entry.title.clone()),
            }),
            None => tracing::warn!("Could not find CIK for ticker {}", wanted),
        }
    }

    Ok(firms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serves canned bodies keyed by URL and remembers what was asked for.
    struct StaticSource {
        bodies: HashMap<String, Vec<u8>>,
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DocumentSource for StaticSource {
        async fn fetch(&self, url: &str, _cancel: &CancellationToken) -> Result<Vec<u8>, EdgarError> {
            self.requested.lock().unwrap().push(url.to_string());
            self.bodies
                .get(url)
                .cloned()
                .ok_or_else(|| EdgarError::FilingDocNotFound(url.to_string()))
        }
    }

    #[test]
    fn archive_url_uses_stripped_cik_and_accession() {
        let urls = EdgarUrls::default();
        let url = urls.primary_doc_url("320193", "000032019323000106", "a10-k20230930.htm");
        assert_eq!(
            url,
            "https://www.sec.gov/Archives/edgar/data/320193/000032019323000106/a10-k20230930.htm"
        );
    }

    #[test]
    fn submissions_url_keeps_padded_cik() {
        let urls = EdgarUrls::default();
        assert_eq!(
            urls.submissions_url("0000320193"),
            "https://data.sec.gov/submissions/CIK0000320193.json"
        );
    }

    #[test]
    fn blank_user_agent_is_rejected() {
        let throttle = Arc::new(RequestThrottle::new(Duration::from_millis(200)));
        let result = EdgarClient::new("   ", throttle);
        assert!(matches!(result, Err(EdgarError::InvalidUserAgent(_))));
    }

    #[test]
    fn user_agent_must_be_a_valid_header() {
        let throttle = Arc::new(RequestThrottle::new(Duration::from_millis(200)));
        assert!(EdgarClient::new(" Research Lab research@example.edu ", throttle.clone()).is_ok());

        let result = EdgarClient::new("Research Lab\nresearch@example.edu", throttle);
        assert!(matches!(result, Err(EdgarError::InvalidUserAgent(_))));
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits_fetch() {
        let throttle = Arc::new(RequestThrottle::new(Duration::from_millis(10)));
        let client = EdgarClient::new("Research Lab research@example.edu", throttle).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = client.fetch("http://127.0.0.1:9/unreachable", &cancel).await;
        assert!(matches!(result, Err(EdgarError::Cancelled)));
    }

    #[tokio::test]
    async fn cancelling_drops_the_in_flight_request() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let never_answers = std::future::pending::<Result<Vec<u8>, EdgarError>>();
        let result = until_cancelled(&cancel, "https://www.sec.gov/slow.htm", never_answers).await;
        assert!(matches!(result, Err(EdgarError::Cancelled)));
    }

    #[tokio::test]
    async fn completed_request_passes_through() {
        let answered = async { Ok::<_, EdgarError>(b"<html></html>".to_vec()) };
        let result = until_cancelled(&CancellationToken::new(), "https://www.sec.gov/doc.htm", answered).await;
        assert_eq!(result.unwrap(), b"<html></html>".to_vec());
    }

    #[tokio::test]
    async fn tickers_resolve_to_padded_ciks() {
        let urls = EdgarUrls::default();
        let body = br#"{
            "0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."},
            "1": {"cik_str": 789019, "ticker": "MSFT", "title": "MICROSOFT CORP"}
        }"#;
        let source = StaticSource {
            bodies: HashMap::from([(urls.company_tickers.clone(), body.to_vec())]),
            requested: Mutex::new(Vec::new()),
        };

        let firms = lookup_tickers(
            &source,
            &urls,
            &["msft".to_string(), "NOPE".to_string()],
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(firms.len(), 1);
        assert_eq!(firms[0].cik10, "0000789019");
        assert_eq!(firms[0].ticker.as_deref(), Some("MSFT"));
        assert_eq!(firms[0].name.as_deref(), Some("MICROSOFT CORP"));
    }

    #[tokio::test]
    async fn no_tickers_means_no_request() {
        let source = StaticSource {
            bodies: HashMap::new(),
            requested: Mutex::new(Vec::new()),
        };
        let firms = lookup_tickers(&source, &EdgarUrls::default(), &[], &CancellationToken::new())
            .await
            .unwrap();
        assert!(firms.is_empty());
        assert!(source.requested.lock().unwrap().is_empty());
    }
}
