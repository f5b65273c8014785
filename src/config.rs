//! Configuração do paperstage carregada a partir de `paperstage.toml`.
//!
//! A struct [`PaperConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `PAPERSTAGE_TEMPLATE_BASE` tem precedência sobre o arquivo.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::collector::DuplicatePolicy;
use crate::exporter::DEFAULT_ARTIFACT_NAME;
use crate::orchestrator::{AdmissionPolicy, OrchestratorConfig, StageTimeouts};
use crate::sandbox::StagedPath;

/// Nome do arquivo procurado no diretório atual quando `--config` não é passado.
pub const CONFIG_FILE: &str = "paperstage.toml";

/// Variável de ambiente que sobrescreve `template_base`.
pub const TEMPLATE_BASE_ENV: &str = "PAPERSTAGE_TEMPLATE_BASE";

/// Configuração de nível superior carregada de `paperstage.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct PaperConfig {
    /// Origem dos templates: URL `http(s)://` ou diretório local.
    #[serde(default = "default_template_base")]
    pub template_base: String,

    /// Executável do motor de geração.
    #[serde(default = "default_engine_program")]
    pub engine_program: String,

    /// Argumentos iniciais passados ao motor antes do protocolo.
    #[serde(default = "default_engine_args")]
    pub engine_args: Vec<String>,

    /// Diretório onde o artefato gerado é entregue.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Nome sugerido para o artefato entregue.
    #[serde(default = "default_artifact_name")]
    pub artifact_name: String,

    /// Caminho fixo de saída dentro do sistema de arquivos virtual.
    #[serde(default = "default_artifact_name")]
    pub output_path: String,

    /// Política quando outro job já está gerando.
    #[serde(default)]
    pub admission: AdmissionPolicy,

    /// Política para caminhos relativos repetidos na seleção.
    #[serde(default)]
    pub duplicate_paths: DuplicatePolicy,

    /// Limites de tempo por estágio.
    #[serde(default)]
    pub timeouts: StageTimeouts,
}

// Valor padrão para a origem dos templates: "./word-template".
fn default_template_base() -> String {
    "./word-template".to_string()
}

// Valor padrão para o motor: "python3".
fn default_engine_program() -> String {
    "python3".to_string()
}

// Valor padrão para os argumentos do motor: ["-m", "md2paper"].
fn default_engine_args() -> Vec<String> {
    vec!["-m".to_string(), "md2paper".to_string()]
}

// Valor padrão para o diretório de saída: o diretório atual.
fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

// Valor padrão para o nome do artefato: "out.docx".
fn default_artifact_name() -> String {
    DEFAULT_ARTIFACT_NAME.to_string()
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            template_base: default_template_base(),
            engine_program: default_engine_program(),
            engine_args: default_engine_args(),
            output_dir: default_output_dir(),
            artifact_name: default_artifact_name(),
            output_path: default_artifact_name(),
            admission: AdmissionPolicy::default(),
            duplicate_paths: DuplicatePolicy::default(),
            timeouts: StageTimeouts::default(),
        }
    }
}

impl PaperConfig {
    /// Carrega a configuração de `path`, ou de `paperstage.toml` no diretório atual.
    ///
    /// Um arquivo explícito ausente é erro; o arquivo padrão ausente resulta
    /// nos valores padrão.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(CONFIG_FILE).exists() => Self::from_file(Path::new(CONFIG_FILE))?,
            None => Self::default(),
        };

        // Variável de ambiente tem precedência sobre o arquivo de configuração.
        if let Ok(base) = std::env::var(TEMPLATE_BASE_ENV) {
            if !base.is_empty() {
                config.template_base = base;
            }
        }

        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Converte a configuração nos parâmetros do orquestrador, validando
    /// o caminho de saída no sistema de arquivos virtual.
    pub fn orchestrator_config(&self) -> Result<OrchestratorConfig> {
        let output_path = StagedPath::parse(&self.output_path)
            .with_context(|| format!("invalid output_path {:?}", self.output_path))?;
        Ok(OrchestratorConfig {
            timeouts: self.timeouts,
            admission: self.admission,
            duplicates: self.duplicate_paths,
            output_path,
            artifact_name: self.artifact_name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = PaperConfig::default();
        assert_eq!(config.template_base, "./word-template");
        assert_eq!(config.engine_program, "python3");
        assert_eq!(config.engine_args, vec!["-m", "md2paper"]);
        assert_eq!(config.artifact_name, "out.docx");
        assert_eq!(config.output_path, "out.docx");
        assert_eq!(config.admission, AdmissionPolicy::Reject);
        assert_eq!(config.duplicate_paths, DuplicatePolicy::LastWriteWins);
        assert_eq!(config.timeouts.generate_ms, 300_000);
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            template_base = "https://templates.example.edu/word/"
            admission = "queue"

            [timeouts]
            fetch_ms = 5000
        "#;
        let config: PaperConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.template_base, "https://templates.example.edu/word/");
        assert_eq!(config.admission, AdmissionPolicy::Queue);
        assert_eq!(config.timeouts.fetch_ms, 5000);
        assert_eq!(config.timeouts.staging_ms, 30_000);
        assert_eq!(config.engine_program, "python3");
        assert_eq!(config.duplicate_paths, DuplicatePolicy::LastWriteWins);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let err = toml::from_str::<PaperConfig>(r#"duplicate_paths = "first_wins""#);
        assert!(err.is_err());
    }

    #[test]
    fn explicit_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "output_dir = \"build\"\nartifact_name = \"thesis.docx\"\n").unwrap();

        let config = PaperConfig::load(Some(&path)).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("build"));
        assert_eq!(config.artifact_name, "thesis.docx");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PaperConfig::load(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn orchestrator_config_validates_output_path() {
        let config = PaperConfig {
            output_path: "build/out.docx".into(),
            ..Default::default()
        };
        let orch = config.orchestrator_config().unwrap();
        assert_eq!(orch.output_path.as_str(), "build/out.docx");

        let escaping = PaperConfig {
            output_path: "../out.docx".into(),
            ..Default::default()
        };
        assert!(escaping.orchestrator_config().is_err());
    }
}
