use std::path::PathBuf;

use super::{TemplateError, TemplateSource};

/// Reads templates from a directory on disk.
#[derive(Debug, Clone)]
pub struct DirTemplateSource {
    root: PathBuf,
}

impl DirTemplateSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TemplateSource for DirTemplateSource {
    async fn fetch(&self, asset: &str) -> Result<Vec<u8>, TemplateError> {
        if asset.contains(['/', '\\']) || asset == ".." {
            return Err(TemplateError::InvalidUrl(asset.to_string()));
        }
        tokio::fs::read(self.root.join(asset))
            .await
            .map_err(|source| TemplateError::Io {
                asset: asset.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_template_from_directory() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("毕业设计（论文）模板-docx.docx"), b"PK\x03\x04").unwrap();

        let source = DirTemplateSource::new(tmp.path());
        let bytes = source.fetch("毕业设计（论文）模板-docx.docx").await.unwrap();
        assert_eq!(bytes, b"PK\x03\x04");
    }

    #[tokio::test]
    async fn missing_template_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = DirTemplateSource::new(tmp.path()).fetch("absent.docx").await.unwrap_err();
        assert!(matches!(err, TemplateError::Io { .. }));
    }

    #[tokio::test]
    async fn nested_asset_names_are_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let err = DirTemplateSource::new(tmp.path()).fetch("../secret").await.unwrap_err();
        assert!(matches!(err, TemplateError::InvalidUrl(_)));
    }
}
