//! Interface de linha de comando do paperstage baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (generate, manifest, types)
//! e flags globais (--config, --log-level, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// paperstage: prepara um artigo em markdown e gera o documento docx.
#[derive(Debug, Parser)]
#[command(name = "paperstage", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Arquivo de configuração (padrão: ./paperstage.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Nível de log; `RUST_LOG` tem precedência quando definido.
    #[arg(long, short = 'l', global = true, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Habilita saída detalhada (imprime o registro de auditoria).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Níveis de log aceitos pela CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
}

impl LogLevel {
    /// Diretiva equivalente para o `EnvFilter` do tracing.
    pub fn directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Prepara os arquivos selecionados e gera o documento.
    Generate {
        /// Arquivos ou diretórios a enviar para o sandbox.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Tipo de documento (grad ou trans).
        #[arg(long = "type", short = 't')]
        document_type: String,

        /// Arquivo markdown de entrada, relativo à seleção.
        /// Perguntado no terminal quando omitido.
        #[arg(long, short)]
        entry: Option<String>,

        /// Diretório de saída; sobrescreve `output_dir` da configuração.
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// Imprime o manifesto da seleção, um caminho relativo por linha.
    Manifest {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Lista os tipos de documento reconhecidos.
    Types,
}
