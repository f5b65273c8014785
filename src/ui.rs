//! Superfície de status do paperstage: spinners e saída colorida.
//!
//! O trait [`StatusSurface`] recebe cada transição de um job e o resultado
//! final. [`JobProgress`] o implementa no terminal usando `indicatif` para o
//! spinner e `console` para as cores.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::state_machine::{AuditRecord, Failure, JobStatus, State};

/// Destino das mensagens de status visíveis ao usuário.
///
/// Todo job termina com exatamente uma chamada a `completed` ou `failed`,
/// de modo que nenhuma mensagem de "em andamento" fica para trás.
pub trait StatusSurface {
    /// O job entrou em um novo estado.
    fn stage(&self, state: State);

    /// O job terminou com falha; `failure` traz o tipo e a mensagem.
    fn failed(&self, failure: &Failure);

    /// O job terminou e o artefato foi entregue em `location`.
    fn completed(&self, location: &str);
}

/// Superfície que descarta tudo (uso como biblioteca, testes).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStatus;

impl StatusSurface for NullStatus {
    fn stage(&self, _state: State) {}
    fn failed(&self, _failure: &Failure) {}
    fn completed(&self, _location: &str) {}
}

/// Indicador visual de progresso para a execução de um job no terminal.
///
/// Exibe um spinner animado durante o processamento e mensagens
/// coloridas para sucesso (verde) e falha (vermelho).
pub struct JobProgress {
    // Barra de progresso/spinner do indicatif.
    pb: ProgressBar,
    // Descrição curta do job, repetida em cada mensagem.
    label: String,
    // Estilo verde para mensagens de sucesso.
    green: Style,
    // Estilo vermelho para mensagens de falha.
    red: Style,
    // Estilo amarelo para o registro de auditoria em andamento.
    yellow: Style,
}

impl JobProgress {
    /// Inicia o spinner com a descrição do job e retorna a instância de progresso.
    pub fn start(label: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.set_message(format!("{}: {label}", State::Idle));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            label: label.to_string(),
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Remove o spinner sem imprimir nada (etapa concluída sem mensagem final).
    pub fn clear(&self) {
        self.pb.finish_and_clear();
    }

    /// Imprime o registro de auditoria formatado em JSON com estilo colorido.
    pub fn print_audit(&self, record: &AuditRecord) {
        let status_style = match record.status {
            JobStatus::Completed => &self.green,
            JobStatus::Failed => &self.red,
            _ => &self.yellow,
        };
        eprintln!();
        eprintln!("{}", status_style.apply_to("─── Audit Record ───"));
        eprintln!("{}", serde_json::to_string_pretty(record).unwrap_or_default());
    }
}

impl StatusSurface for JobProgress {
    fn stage(&self, state: State) {
        self.pb.set_message(format!("{state}: {}", self.label));
    }

    fn failed(&self, failure: &Failure) {
        self.pb.finish_and_clear();
        eprintln!("  {} {failure}", self.red.apply_to("✗"));
    }

    fn completed(&self, location: &str) {
        self.pb.finish_and_clear();
        eprintln!("  {} Saved {location}", self.green.apply_to("✓"));
    }
}
