//! Typed wrappers over the backend routes.

use tracing::info;

use super::client::ApiClient;
use super::types::{
    AnalysisRequest, CefrLevel, CreateDocumentRequest, CreateDocumentResponse, DeepToken,
    DetailResponse, DocumentDetail, DueCard, EvaluateTranslationRequest,
    GenerateFlashcardRequest, LiteToken, LoginRequest, ReviewAck, ScenarioList, StudyPlan,
    SubmitReviewRequest, TokensResponse, TranslationVerdict, UserProfile,
};
use crate::error::ApiResult;

impl ApiClient {
    /// Log in and start a server session.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<UserProfile> {
        let profile: UserProfile = self
            .post("/api/auth/login/", &LoginRequest::new(username, password))
            .await?;
        info!(
            user = %profile.username,
            level = %profile.proficiency_level,
            "Logged in"
        );
        Ok(profile)
    }

    /// Profile of the logged-in user.
    pub async fn me(&self) -> ApiResult<UserProfile> {
        self.get("/api/auth/me/").await
    }

    /// End the server session.
    pub async fn logout(&self) -> ApiResult<String> {
        let response: DetailResponse = self
            .post("/api/auth/logout/", &serde_json::json!({}))
            .await?;
        Ok(response.detail)
    }

    /// Clinical scenarios, for the given level or the user's own level.
    pub async fn scenarios(&self, level: Option<CefrLevel>) -> ApiResult<ScenarioList> {
        match level {
            Some(level) => self.get(&format!("/api/scenarios/?level={}", level)).await,
            None => self.get("/api/scenarios/").await,
        }
    }

    /// Create a document and return its id.
    pub async fn create_document(&self, text: &str, title: &str) -> ApiResult<i64> {
        let response: CreateDocumentResponse = self
            .post("/api/documents/", &CreateDocumentRequest::new(text, title))
            .await?;
        Ok(response.document_id)
    }

    /// Fast lexical tokenization of a document.
    pub async fn lite_analysis(&self, document_id: i64, limit: u32) -> ApiResult<Vec<LiteToken>> {
        let response: TokensResponse<LiteToken> = self
            .post(
                "/api/analysis/lite/",
                &AnalysisRequest { document_id, limit },
            )
            .await?;
        Ok(response.tokens)
    }

    /// Slower pass adding case and syntactic role.
    pub async fn deep_analysis(&self, document_id: i64, limit: u32) -> ApiResult<Vec<DeepToken>> {
        let response: TokensResponse<DeepToken> = self
            .post(
                "/api/analysis/deep/",
                &AnalysisRequest { document_id, limit },
            )
            .await?;
        Ok(response.tokens)
    }

    /// Legacy full detail: document plus token-to-word mapping.
    pub async fn document_detail(&self, document_id: i64) -> ApiResult<DocumentDetail> {
        self.get(&format!("/api/documents/{}/", document_id)).await
    }

    /// Generate a flashcard for a document, optionally focused on one word.
    pub async fn generate_flashcard(
        &self,
        document_id: i64,
        word_id: Option<i64>,
    ) -> ApiResult<StudyPlan> {
        self.post(
            "/api/study/generate/",
            &GenerateFlashcardRequest {
                document_id,
                word_id,
            },
        )
        .await
    }

    /// Have the backend judge a translation attempt.
    pub async fn evaluate_translation(
        &self,
        request: &EvaluateTranslationRequest,
    ) -> ApiResult<TranslationVerdict> {
        self.post("/api/study/evaluate/", request).await
    }

    /// Cards due for review, in server order.
    pub async fn due_cards(&self) -> ApiResult<Vec<DueCard>> {
        self.get("/api/study/review/").await
    }

    /// Submit a 1-4 score for a card.
    pub async fn submit_review(&self, card_id: i64, score: u8) -> ApiResult<ReviewAck> {
        self.post(
            &format!("/api/study/review/{}/", card_id),
            &SubmitReviewRequest { score },
        )
        .await
    }
}
