//! Erros ao buscar templates de documento.
//!
//! Define [`TemplateError`] com variantes para respostas HTTP sem sucesso,
//! falhas de rede, URLs inválidas e erros de leitura local.

use thiserror::Error;

/// Erros que podem ocorrer ao buscar um template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// O servidor respondeu com um status diferente de 2xx (ex.: 404).
    #[error("template {asset} returned status {status}")]
    Status { asset: String, status: u16 },

    /// Falha de rede subjacente (DNS, conexão recusada, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A URL base ou o nome do asset não formam uma URL válida.
    #[error("invalid template url: {0}")]
    InvalidUrl(String),

    /// Falha ao ler o template de um diretório local.
    #[error("cannot read template {asset}: {source}")]
    Io {
        asset: String,
        #[source]
        source: std::io::Error,
    },
}
