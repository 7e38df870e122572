//! Command-line front end.
//!
//! Each subcommand renders its output into a [`CliResult`]; the binary prints
//! the message and exits with the code. The interactive review loop is the
//! exception and writes prompts as it goes.

use clap::Subcommand;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

use crate::analysis::{AnalysisOrchestrator, AnalysisSession, Token};
use crate::api::{ApiClient, CefrLevel, EvaluateTranslationRequest, UserProfile};
use crate::config::Config;
use crate::error::{AppError, AppResult, ReviewError};
use crate::review::{RateOutcome, ReviewQueue, ReviewScore};
use crate::storage::{AnalysisRecord, ReviewLogEntry, Storage};

/// KlinikDeutsch subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Analyze a German sentence (lexical pass, then grammar)
    Analyze {
        /// Text to analyze
        text: String,

        /// Document title sent to the backend
        #[arg(long)]
        title: Option<String>,
    },

    /// Generate a flashcard for a document
    Flashcard {
        /// Document id
        #[arg(long)]
        document: i64,

        /// Word entity id to focus on
        #[arg(long)]
        word: Option<i64>,
    },

    /// Have a translation attempt evaluated
    Evaluate {
        /// Portuguese challenge sentence
        #[arg(long)]
        challenge: String,

        /// Your German translation
        #[arg(long)]
        attempt: String,

        /// Original German context
        #[arg(long, default_value = "")]
        context: String,
    },

    /// Review due flashcards, scoring each 1-4 (q quits)
    Review,

    /// List clinical practice scenarios
    Scenarios {
        /// Level: A1, B1 or C1 (defaults to your own)
        #[arg(long)]
        level: Option<CefrLevel>,
    },

    /// Show the logged-in profile
    Me,

    /// Show local analysis and review history
    History {
        /// Maximum number of entries per section
        #[arg(long, default_value = "10")]
        limit: u32,
    },
}

impl Commands {
    /// Whether the command talks to the backend as a logged-in user.
    pub fn needs_session(&self) -> bool {
        !matches!(self, Commands::History { .. })
    }
}

/// Result of CLI command execution.
pub struct CliResult {
    /// Exit code (0 = success)
    pub exit_code: i32,
    /// Output message
    pub message: String,
}

impl CliResult {
    /// Create a success result with the given message.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            message: message.into(),
        }
    }

    /// Create an error result with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            message: message.into(),
        }
    }
}

/// Log in with the configured credentials.
pub async fn ensure_session(client: &ApiClient, config: &Config) -> AppResult<UserProfile> {
    let (Some(username), Some(password)) = (&config.api.username, &config.api.password) else {
        return Err(AppError::Config {
            message: "KLINIK_USERNAME and KLINIK_PASSWORD must be set".to_string(),
        });
    };
    Ok(client.login(username, password).await?)
}

/// Execute a CLI command.
pub async fn execute_command(
    command: Commands,
    client: &ApiClient,
    storage: &dyn Storage,
    config: &Config,
) -> CliResult {
    match command {
        Commands::Analyze { text, title } => {
            execute_analyze(client, storage, config, text, title).await
        }
        Commands::Flashcard { document, word } => execute_flashcard(client, document, word).await,
        Commands::Evaluate {
            challenge,
            attempt,
            context,
        } => execute_evaluate(client, challenge, attempt, context).await,
        Commands::Review => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            execute_review(client, storage, stdin).await
        }
        Commands::Scenarios { level } => execute_scenarios(client, level).await,
        Commands::Me => execute_me(client).await,
        Commands::History { limit } => execute_history(storage, limit).await,
    }
}

/// Execute analyze command.
async fn execute_analyze(
    client: &ApiClient,
    storage: &dyn Storage,
    config: &Config,
    text: String,
    title: Option<String>,
) -> CliResult {
    let mut analysis_config = config.analysis.clone();
    if let Some(title) = title {
        analysis_config.document_title = title;
    }

    let orchestrator = AnalysisOrchestrator::new(Arc::new(client.clone()), analysis_config);

    let mut updates = orchestrator.subscribe();
    let lite_printer = tokio::spawn(async move {
        if let Ok(session) = updates
            .wait_for(|s| s.phase().is_partial())
            .await
        {
            println!("Análise rápida:\n{}", format_tokens(session.tokens().rows()));
        }
    });

    let session = orchestrator.analyze(text).await;
    lite_printer.abort();

    let record = AnalysisRecord::from_session(&session);
    if let Err(e) = storage.save_analysis(&record).await {
        warn!(error = %e, "Failed to save analysis history");
    }

    render_session(&session)
}

fn render_session(session: &AnalysisSession) -> CliResult {
    let mut output = String::new();
    output.push_str(&format!(
        "Documento: {}  Fase: {}\n",
        session
            .document_id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string()),
        session.phase()
    ));
    if !session.tokens().is_empty() {
        output.push_str(&format_tokens(session.tokens().rows()));
    }
    if let Some(warning) = session.warning() {
        output.push_str(&format!("Aviso: {}\n", warning.message));
    }

    match session.error() {
        Some(error) => {
            output.push_str(&format!("Erro: {}\n", error.message));
            CliResult::error(output)
        }
        None => CliResult::success(output),
    }
}

/// Execute flashcard command.
async fn execute_flashcard(client: &ApiClient, document_id: i64, word_id: Option<i64>) -> CliResult {
    let plan = match client.generate_flashcard(document_id, word_id).await {
        Ok(plan) => plan,
        Err(e) => return CliResult::error(e.user_message()),
    };

    if plan.study_items_count == 0 {
        return CliResult::success("Nenhum item de estudo encontrado para este documento.");
    }

    let card = &plan.llm_result;
    let mut output = String::new();
    if let Some(item) = plan.items.first() {
        output.push_str(&format!("Palavra: {} ({})\n", item.surface_form, item.lemma));
    }
    output.push_str(&format!("Análise: {}\n", card.analise_rapida));
    if !card.nivel_c1.is_empty() {
        output.push_str(&format!("Nível C1: {}\n", card.nivel_c1.join(", ")));
    }
    output.push_str(&format!("Variação nativa: {}\n", card.variacao_nativa));
    output.push_str(&format!("Desafio: {}\n", card.desafio_traducao));
    CliResult::success(output)
}

/// Execute evaluate command.
async fn execute_evaluate(
    client: &ApiClient,
    challenge: String,
    attempt: String,
    context: String,
) -> CliResult {
    let request = EvaluateTranslationRequest::new(challenge, attempt, context);
    match client.evaluate_translation(&request).await {
        Ok(verdict) => {
            let mut output = String::new();
            output.push_str(&format!(
                "{}\n",
                if verdict.correto { "Correto!" } else { "Quase." }
            ));
            output.push_str(&format!("{}\n", verdict.feedback_curto));
            if !verdict.versao_ideal.is_empty() {
                output.push_str(&format!("Versão ideal: {}\n", verdict.versao_ideal));
            }
            CliResult::success(output)
        }
        Err(e) => CliResult::error(e.user_message()),
    }
}

/// Execute review command, reading scores from `input`.
pub async fn execute_review<R>(client: &ApiClient, storage: &dyn Storage, input: R) -> CliResult
where
    R: AsyncBufRead + Unpin,
{
    let mut queue = match ReviewQueue::load(client).await {
        Ok(queue) => queue,
        Err(e) => return CliResult::error(e.user_message()),
    };
    if queue.is_finished() {
        return CliResult::success("Nenhum card para revisar agora.");
    }

    let mut lines = input.lines();
    while let Some(card) = queue.current().cloned() {
        println!(
            "\n[{}/{}] {}\n  {}",
            queue.rated() + 1,
            queue.total(),
            card.word,
            card.challenge_pt
        );
        if !card.context_original.is_empty() {
            println!("  Contexto: {}", card.context_original);
        }
        println!("Nota (1 de novo, 2 difícil, 3 bom, 4 fácil, q sai):");

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => return CliResult::error(format!("Failed to read input: {}", e)),
        };
        let answer = line.trim();
        if answer.eq_ignore_ascii_case("q") {
            break;
        }

        let score = match answer.parse::<ReviewScore>() {
            Ok(score) => score,
            Err(e) => {
                println!("{}", e.user_message());
                continue;
            }
        };

        match queue.rate(client, card.id, score).await {
            Ok(outcome) => {
                let entry = ReviewLogEntry::from_ack(&card, score, outcome.ack());
                if let Err(e) = storage.log_review(&entry).await {
                    warn!(error = %e, "Failed to log review");
                }
                println!(
                    "Próxima revisão: {}",
                    outcome.ack().next_review_at.format("%Y-%m-%d")
                );
                if let RateOutcome::Finished { .. } = outcome {
                    break;
                }
            }
            Err(ReviewError::Api(e)) => {
                println!("{}", e.user_message());
            }
            Err(e) => return CliResult::error(e.user_message()),
        }
    }

    info!(rated = queue.rated(), total = queue.total(), "Review session ended");
    CliResult::success(format!(
        "Revisados {} de {} cards.",
        queue.rated(),
        queue.total()
    ))
}

/// Execute scenarios command.
async fn execute_scenarios(client: &ApiClient, level: Option<CefrLevel>) -> CliResult {
    match client.scenarios(level).await {
        Ok(list) => {
            let mut output = String::new();
            output.push_str(&format!(
                "Cenários {} ({}):\n",
                list.selected_level, list.count
            ));
            for scenario in &list.items {
                output.push_str(&format!("  [{}] {}\n", scenario.id, scenario.text));
            }
            CliResult::success(output)
        }
        Err(e) => CliResult::error(e.user_message()),
    }
}

/// Execute me command.
async fn execute_me(client: &ApiClient) -> CliResult {
    match client.me().await {
        Ok(profile) => CliResult::success(format!(
            "{} <{}> nível {}",
            profile.username, profile.email, profile.proficiency_level
        )),
        Err(e) => CliResult::error(e.user_message()),
    }
}

/// Execute history command.
async fn execute_history(storage: &dyn Storage, limit: u32) -> CliResult {
    let mut output = String::new();

    match storage.list_analyses(limit).await {
        Ok(records) => {
            output.push_str(&format!("Análises recentes: {}\n", records.len()));
            for record in &records {
                output.push_str(&format!(
                    "  {} {} [{}] {} tokens  {}\n",
                    record.created_at.format("%Y-%m-%d %H:%M"),
                    record.phrase_hash,
                    record.phase,
                    record.tokens.len(),
                    record.phrase.trim()
                ));
            }
        }
        Err(e) => return CliResult::error(format!("Failed to load analyses: {}", e)),
    }

    match storage.list_reviews(limit).await {
        Ok(entries) => {
            output.push_str(&format!("Revisões recentes: {}\n", entries.len()));
            for entry in &entries {
                output.push_str(&format!(
                    "  {} {} nota {} -> {}\n",
                    entry.created_at.format("%Y-%m-%d %H:%M"),
                    entry.word,
                    entry.score.value(),
                    entry.next_review_at.format("%Y-%m-%d")
                ));
            }
        }
        Err(e) => return CliResult::error(format!("Failed to load reviews: {}", e)),
    }

    CliResult::success(output)
}

// Helper functions

fn format_tokens(tokens: &[Token]) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "{:>3}  {:<16} {:<14} {:<6} {:<3} {:<4} {:<9} {:>5}\n",
        "id", "forma", "lema", "pos", "gen", "caso", "função", "word"
    ));
    for token in tokens {
        output.push_str(&format!(
            "{:>3}  {:<16} {:<14} {:<6} {:<3} {:<4} {:<9} {:>5}\n",
            token.token_id,
            token.display_form(),
            token.lemma,
            token.pos,
            token.gender.as_deref().unwrap_or("-"),
            token.case.map(|c| c.as_str()).unwrap_or("-"),
            token.syntactic_role.map(|r| r.as_str()).unwrap_or("-"),
            token
                .word_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ));
    }
    output
}
