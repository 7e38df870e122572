use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::{GrammaticalCase, SyntacticRole, TokenId};

/// Response from the CSRF bootstrap endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct CsrfResponse {
    #[serde(rename = "csrfToken", default)]
    pub csrf_token: Option<String>,
}

/// Login credentials
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Authenticated user profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub proficiency_level: CefrLevel,
}

/// CEFR proficiency level supported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CefrLevel {
    A1,
    B1,
    C1,
}

impl CefrLevel {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CefrLevel::A1 => "A1",
            CefrLevel::B1 => "B1",
            CefrLevel::C1 => "C1",
        }
    }
}

impl std::fmt::Display for CefrLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CefrLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A1" => Ok(CefrLevel::A1),
            "B1" => Ok(CefrLevel::B1),
            "C1" => Ok(CefrLevel::C1),
            _ => Err(format!("Unknown level: {} (use A1, B1 or C1)", s)),
        }
    }
}

/// Generic `{"detail": ...}` acknowledgement
#[derive(Debug, Clone, Deserialize)]
pub struct DetailResponse {
    #[serde(default)]
    pub detail: String,
}

/// One clinical practice scenario
#[derive(Debug, Clone, Deserialize)]
pub struct ClinicalScenario {
    pub id: i64,
    pub text: String,
    pub proficiency_level: CefrLevel,
}

/// Scenario listing for a proficiency level
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioList {
    pub proficiency_level: CefrLevel,
    pub selected_level: CefrLevel,
    pub count: usize,
    pub items: Vec<ClinicalScenario>,
}

/// Request to create a document from raw text
#[derive(Debug, Clone, Serialize)]
pub struct CreateDocumentRequest {
    pub text: String,
    pub title: String,
}

/// Response to document creation
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDocumentResponse {
    pub document_id: i64,
}

/// Request body shared by lite and deep analysis
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    pub document_id: i64,
    pub limit: u32,
}

/// Token returned by lite analysis (lexical fields only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteToken {
    pub token_id: TokenId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surface: Option<String>,
    pub lemma: String,
    pub pos: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

/// Token returned by deep analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeepToken {
    pub token_id: TokenId,
    pub surface: String,
    pub lemma: String,
    pub pos: String,
    #[serde(default)]
    pub gender: Option<String>,
    pub case: GrammaticalCase,
    pub syntactic_role: SyntacticRole,
    pub confidence: f64,
}

/// Token list envelope used by both analysis phases
#[derive(Debug, Clone, Deserialize)]
pub struct TokensResponse<T> {
    pub tokens: Vec<T>,
}

/// Durable word entity from the legacy detail endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordEntity {
    pub id: i64,
    pub lemma: String,
    pub pos_tag: String,
    #[serde(default)]
    pub gender: Option<String>,
}

/// Token relation from the legacy detail endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailToken {
    /// Relation id; the same id lite and deep analysis report as `token_id`.
    pub id: TokenId,
    #[serde(default)]
    pub position: Option<u32>,
    #[serde(default)]
    pub grammatical_case: Option<String>,
    pub word: WordEntity,
}

/// Stored document as serialized by the backend
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentInfo {
    pub id: i64,
    pub title: String,
    pub raw_text: String,
    #[serde(default)]
    pub complexity_score: Option<serde_json::Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Legacy full-detail response
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentDetail {
    pub document: DocumentInfo,
    pub tokens: Vec<DetailToken>,
}

/// Request to generate a flashcard for one word of a document
#[derive(Debug, Clone, Serialize)]
pub struct GenerateFlashcardRequest {
    pub document_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_id: Option<i64>,
}

/// LLM-generated flashcard content
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FlashcardContent {
    #[serde(default)]
    pub analise_rapida: String,
    #[serde(default)]
    pub nivel_c1: Vec<String>,
    #[serde(default)]
    pub variacao_nativa: String,
    #[serde(default)]
    pub desafio_traducao: String,
}

/// One study candidate the flashcard was built from
#[derive(Debug, Clone, Deserialize)]
pub struct StudyItem {
    #[serde(default)]
    pub word_token_id: Option<i64>,
    #[serde(default)]
    pub lemma: String,
    #[serde(default)]
    pub surface_form: String,
    #[serde(default)]
    pub context_sentence: String,
    #[serde(default)]
    pub grammatical_case: String,
}

/// Response to flashcard generation
#[derive(Debug, Clone, Deserialize)]
pub struct StudyPlan {
    pub document_id: i64,
    #[serde(default)]
    pub study_items_count: usize,
    #[serde(default)]
    pub items: Vec<StudyItem>,
    #[serde(default)]
    pub llm_result: FlashcardContent,
}

/// Request to evaluate a translation attempt
#[derive(Debug, Clone, Serialize)]
pub struct EvaluateTranslationRequest {
    pub desafio_pt: String,
    pub tentativa_de: String,
    pub contexto_original: String,
}

/// LLM verdict on a translation attempt
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TranslationVerdict {
    #[serde(default)]
    pub correto: bool,
    #[serde(default)]
    pub feedback_curto: String,
    #[serde(default)]
    pub versao_ideal: String,
}

/// Flashcard scheduled for review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DueCard {
    pub id: i64,
    #[serde(default)]
    pub word_token_id: Option<i64>,
    pub word: String,
    #[serde(default)]
    pub challenge_pt: String,
    #[serde(default)]
    pub nivel_c1: Vec<String>,
    #[serde(default)]
    pub context_original: String,
    #[serde(default)]
    pub variacao_nativa: String,
    #[serde(default)]
    pub next_review_at: Option<DateTime<Utc>>,
}

/// Review score submission
#[derive(Debug, Clone, Serialize)]
pub struct SubmitReviewRequest {
    pub score: u8,
}

/// Server acknowledgement of a review
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReviewAck {
    pub id: i64,
    pub retention_level: i32,
    pub next_review_at: DateTime<Utc>,
}

impl LoginRequest {
    /// Create a login request
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl CreateDocumentRequest {
    /// Create a document request with a title
    pub fn new(text: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            title: title.into(),
        }
    }
}

impl EvaluateTranslationRequest {
    /// Create an evaluation request
    pub fn new(
        desafio_pt: impl Into<String>,
        tentativa_de: impl Into<String>,
        contexto_original: impl Into<String>,
    ) -> Self {
        Self {
            desafio_pt: desafio_pt.into(),
            tentativa_de: tentativa_de.into(),
            contexto_original: contexto_original.into(),
        }
    }
}
