use std::time::Duration;

use reqwest::{Client, Url};

use super::{TemplateError, TemplateSource};

/// Fetches templates from a static asset location over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTemplateSource {
    client: Client,
    base_url: Url,
}

impl HttpTemplateSource {
    /// `base_url` is the directory holding the templates; a trailing slash is
    /// added when missing so asset names join beneath it.
    pub fn new(base_url: &str) -> Result<Self, TemplateError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Self::with_client(client, base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self, TemplateError> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized).map_err(|e| TemplateError::InvalidUrl(format!("{base_url}: {e}")))?;
        Ok(Self { client, base_url })
    }

    /// Location an asset is fetched from. Non-ASCII names are percent-encoded.
    pub fn asset_url(&self, asset: &str) -> Result<Url, TemplateError> {
        if asset.contains(['/', '\\', '?', '#']) {
            return Err(TemplateError::InvalidUrl(asset.to_string()));
        }
        self.base_url
            .join(asset)
            .map_err(|e| TemplateError::InvalidUrl(format!("{asset}: {e}")))
    }
}

impl TemplateSource for HttpTemplateSource {
    async fn fetch(&self, asset: &str) -> Result<Vec<u8>, TemplateError> {
        let url = self.asset_url(asset)?;
        tracing::debug!(%url, "fetching template");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TemplateError::Status {
                asset: asset.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}
