use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::ReferenceTextProvider;
use crate::error::SourceError;

/// Fetches raw lyric text over HTTP from a URL template containing `{id}`
pub struct HttpReferenceProvider {
    client: Client,
    url_template: String,
}

impl HttpReferenceProvider {
    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url_template: url_template.into(),
        }
    }

    /// URL for an identifier
    pub fn url_for(&self, identifier: &str) -> String {
        self.url_template.replace("{id}", identifier)
    }
}

#[async_trait]
impl ReferenceTextProvider for HttpReferenceProvider {
    async fn fetch(&self, identifier: &str) -> Result<String, SourceError> {
        let url = self.url_for(identifier);
        debug!("Fetching reference text from {}", url);

        let response = self
            .client
            .get(&url)
            .header("accept", "text/plain")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Err(SourceError::Empty);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for() {
        let provider = HttpReferenceProvider::new("https://lyrics.example/{id}/raw");

        assert_eq!(provider.url_for("abc123"), "https://lyrics.example/abc123/raw");
    }
}
