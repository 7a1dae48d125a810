use std::fmt;

/// Upstream failure with enough context to tell a bad symbol from a broken provider.
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub provider: &'static str,
    pub stage: &'static str,
    pub status: Option<u16>,
    pub detail: String,
    pub raw_body: Option<String>,
}

impl ProviderError {
    pub fn new(provider: &'static str, stage: &'static str, detail: impl Into<String>) -> Self {
        Self {
            provider,
            stage,
            status: None,
            detail: detail.into(),
            raw_body: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_raw_body(mut self, raw_body: impl Into<String>) -> Self {
        self.raw_body = Some(raw_body.into());
        self
    }

    /// Client errors other than 429 will not improve on retry.
    pub fn is_retryable(&self) -> bool {
        match self.status {
            Some(429) => true,
            Some(s) => !(400..500).contains(&s),
            None => self.stage != "rate_limit" && self.stage != "not_found",
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "market data error (provider={}, stage={}",
            self.provider, self.stage
        )?;
        if let Some(status) = self.status {
            write!(f, ", status={status}")?;
        }
        write!(f, "): {}", self.detail)
    }
}

impl std::error::Error for ProviderError {}
