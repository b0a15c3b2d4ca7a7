//! Onboarding tracker, published as a spreadsheet CSV export.

use super::{fetch_first, FetchError, SourceKind, TelemetrySource};
use crate::mock;
use crate::proxy::ProxyChain;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

/// One sheet row, keyed by header. `id` is the zero-based data row index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CenterRecord {
    pub id: String,
    pub fields: BTreeMap<String, String>,
}

impl CenterRecord {
    /// Case-insensitive lookup by header name.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(header))
            .map(|(_, value)| value.as_str())
    }

    /// Rows needing attention: data gathering not completed, or a
    /// re-evaluation requested.
    pub fn is_highlighted(&self) -> bool {
        let matches = |header: &str, expected: &str| {
            self.get(header)
                .is_some_and(|v| v.trim().eq_ignore_ascii_case(expected))
        };
        matches("Data Gathering Completion", "no") || matches("Reevaluation Needed", "yes")
    }
}

/// Headers in sheet order plus the data rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingSheet {
    pub headers: Vec<String>,
    pub rows: Vec<CenterRecord>,
}

impl OnboardingSheet {
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() || self.rows.is_empty()
    }
}

/// Parse a CSV export: the first non-blank row is the header row.
///
/// Rows whose cells are all blank are dropped. Rows shorter than the header
/// leave the trailing fields unset.
pub fn parse_sheet(text: &str) -> Result<OnboardingSheet, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    let mut rows = rows.into_iter();
    let Some(header_row) = rows.next() else {
        return Ok(OnboardingSheet::default());
    };
    let headers: Vec<String> = header_row.iter().map(|h| h.trim().to_string()).collect();

    let records = rows
        .enumerate()
        .map(|(index, row)| CenterRecord {
            id: index.to_string(),
            fields: headers.iter().cloned().zip(row).collect(),
        })
        .collect();

    Ok(OnboardingSheet {
        headers,
        rows: records,
    })
}

pub struct OnboardingSource {
    chain: ProxyChain,
    endpoints: Vec<String>,
}

impl OnboardingSource {
    pub fn new(chain: ProxyChain, endpoints: Vec<String>) -> Self {
        Self { chain, endpoints }
    }
}

#[async_trait]
impl TelemetrySource for OnboardingSource {
    type Snapshot = OnboardingSheet;

    fn kind(&self) -> SourceKind {
        SourceKind::Onboarding
    }

    async fn fetch(&self, cancel: &CancellationToken) -> Result<OnboardingSheet, FetchError> {
        let name = SourceKind::Onboarding.as_str();
        fetch_first(name, &self.endpoints, cancel, |endpoint| async move {
            let text = self
                .chain
                .resolve_text(&endpoint, cancel)
                .await
                .map_err(|e| FetchError::from_resolve(name, e))?;
            tracing::debug!(bytes = text.len(), "Onboarding sheet downloaded");

            let sheet = parse_sheet(&text).map_err(|e| FetchError::validation(name, e.to_string()))?;
            if sheet.is_empty() {
                return Err(FetchError::validation(name, "sheet has no data rows"));
            }
            Ok(sheet)
        })
        .await
    }

    fn mock_snapshot(&self) -> OnboardingSheet {
        mock::onboarding_sheet()
    }
}
