//! Client for the Treasury Fiscal Data "Debt to the Penny" endpoint.
//!
//! One GET, one decode. The daemon calls [`TreasuryClient::fetch`] exactly
//! once at startup and never retries; everything downstream runs off the
//! snapshot it returns.

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Fixed endpoint: latest debt_outstanding record, newest first.
pub const DEBT_OUTSTANDING_URL: &str = "https://api.fiscaldata.treasury.gov/services/api/fiscal_service/v2/accounting/od/debt_outstanding?sort=-record_date&limit=1";

/// Errors from a single fetch attempt.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never completed: connect failure, DNS, aborted body read.
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// A body arrived but it is not the expected envelope, or the amount
    /// field is missing, non-numeric, or out of range.
    #[error("unexpected response: {0}")]
    Decode(String),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct Record {
    debt_outstanding_amt: String,
    #[serde(default)]
    record_date: Option<String>,
}

/// Total public debt outstanding at the time of the last successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct DebtSnapshot {
    amount: f64,
    record_date: Option<String>,
}

impl DebtSnapshot {
    /// Dollar amount, exactly as parsed from the API (no rounding).
    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// Record date reported alongside the figure, when the API sent one.
    pub fn record_date(&self) -> Option<&str> {
        self.record_date.as_deref()
    }
}

pub struct TreasuryClient {
    client: Client,
    url: String,
}

impl TreasuryClient {
    /// Client against the fixed production endpoint.
    pub fn new() -> Self {
        Self::with_url(DEBT_OUTSTANDING_URL)
    }

    /// Client against an arbitrary URL. Test seam; the daemon uses [`new`].
    ///
    /// [`new`]: TreasuryClient::new
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    /// Issue the single GET and decode the latest snapshot.
    ///
    /// No retries, no custom headers, transport-default timeouts. Transport
    /// problems come back as [`FetchError::Network`], anything wrong with the
    /// body as [`FetchError::Decode`].
    pub async fn fetch(&self) -> Result<DebtSnapshot, FetchError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(%status, bytes = body.len(), "debt endpoint responded");
        decode_snapshot(&body)
    }
}

impl Default for TreasuryClient {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_snapshot(body: &[u8]) -> Result<DebtSnapshot, FetchError> {
    let envelope: Envelope =
        serde_json::from_slice(body).map_err(|err| FetchError::Decode(err.to_string()))?;

    let record = envelope
        .data
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::Decode("data array is empty".into()))?;

    let amount: f64 = record.debt_outstanding_amt.trim().parse().map_err(|_| {
        FetchError::Decode(format!(
            "debt_outstanding_amt is not numeric: {:?}",
            record.debt_outstanding_amt
        ))
    })?;

    // The snapshot is defined as a non-negative dollar figure.
    if !amount.is_finite() || amount < 0.0 {
        return Err(FetchError::Decode(format!(
            "debt_outstanding_amt out of range: {amount}"
        )));
    }

    Ok(DebtSnapshot {
        amount,
        record_date: record.record_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_well_formed_body_exactly() {
        let body = br#"{"data":[{"debt_outstanding_amt":"35000000000000.00","record_date":"2024-09-06"}]}"#;
        let snapshot = decode_snapshot(body).expect("body should decode");
        assert_eq!(snapshot.amount(), 35000000000000.00);
        assert_eq!(snapshot.record_date(), Some("2024-09-06"));
    }

    #[test]
    fn ignores_extra_fields() {
        let body = br#"{"data":[{"debt_outstanding_amt":"123.45","record_date":"2024-01-02","src_line_nbr":"1"}],"meta":{"count":1}}"#;
        let snapshot = decode_snapshot(body).expect("extra fields should be ignored");
        assert_eq!(snapshot.amount(), 123.45);
    }

    #[test]
    fn missing_record_date_is_fine() {
        let body = br#"{"data":[{"debt_outstanding_amt":"100.0"}]}"#;
        let snapshot = decode_snapshot(body).expect("record_date is optional");
        assert_eq!(snapshot.record_date(), None);
    }

    #[test]
    fn empty_data_array_is_a_decode_error() {
        let err = decode_snapshot(br#"{"data":[]}"#).expect_err("empty data should fail");
        assert!(matches!(err, FetchError::Decode(_)), "got {err:?}");
    }

    #[test]
    fn non_numeric_amount_is_a_decode_error() {
        let body = br#"{"data":[{"debt_outstanding_amt":"abc"}]}"#;
        let err = decode_snapshot(body).expect_err("non-numeric amount should fail");
        assert!(matches!(err, FetchError::Decode(_)), "got {err:?}");
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn negative_amount_is_a_decode_error() {
        let body = br#"{"data":[{"debt_outstanding_amt":"-1.0"}]}"#;
        let err = decode_snapshot(body).expect_err("negative amount should fail");
        assert!(matches!(err, FetchError::Decode(_)), "got {err:?}");
    }

    #[test]
    fn non_json_body_is_a_decode_error() {
        let err = decode_snapshot(b"<html>mainframe down</html>")
            .expect_err("html body should fail");
        assert!(matches!(err, FetchError::Decode(_)), "got {err:?}");
    }

    #[test]
    fn empty_body_is_a_decode_error() {
        let err = decode_snapshot(b"").expect_err("empty body should fail");
        assert!(matches!(err, FetchError::Decode(_)), "got {err:?}");
    }
}
