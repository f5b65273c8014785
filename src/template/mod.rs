pub mod client;
pub mod error;
pub mod local;

pub use client::HttpTemplateSource;
pub use error::TemplateError;
pub use local::DirTemplateSource;

/// Where template documents are fetched from.
#[allow(async_fn_in_trait)]
pub trait TemplateSource {
    /// Fetch the raw bytes of the named template asset.
    async fn fetch(&self, asset: &str) -> Result<Vec<u8>, TemplateError>;
}

/// Either kind of source, picked from configuration.
#[derive(Debug, Clone)]
pub enum AnyTemplateSource {
    Http(HttpTemplateSource),
    Dir(DirTemplateSource),
}

impl AnyTemplateSource {
    /// `http://` and `https://` locations are fetched over the network,
    /// anything else is treated as a local directory.
    pub fn from_location(location: &str) -> Result<Self, TemplateError> {
        if location.starts_with("http://") || location.starts_with("https://") {
            Ok(Self::Http(HttpTemplateSource::new(location)?))
        } else {
            Ok(Self::Dir(DirTemplateSource::new(location)))
        }
    }
}

impl TemplateSource for AnyTemplateSource {
    async fn fetch(&self, asset: &str) -> Result<Vec<u8>, TemplateError> {
        match self {
            AnyTemplateSource::Http(source) => source.fetch(asset).await,
            AnyTemplateSource::Dir(source) => source.fetch(asset).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_picks_source_kind() {
        assert!(matches!(
            AnyTemplateSource::from_location("https://example.org/word-template/").unwrap(),
            AnyTemplateSource::Http(_)
        ));
        assert!(matches!(
            AnyTemplateSource::from_location("./word-template").unwrap(),
            AnyTemplateSource::Dir(_)
        ));
    }
}
