//! Review session over the cards due today.
//!
//! The queue is fetched once and consumed front to back. A rating only
//! advances the queue after the server has accepted it; a failed submission
//! leaves the same card current so it can be rated again.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::{ApiClient, DueCard, ReviewAck};
use crate::error::{ApiResult, ReviewError, ReviewResult};

/// Self-assessed recall quality, 1 (again) to 4 (easy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ReviewScore(u8);

impl ReviewScore {
    /// Forgot the card.
    pub const AGAIN: ReviewScore = ReviewScore(1);
    /// Recalled with effort.
    pub const HARD: ReviewScore = ReviewScore(2);
    /// Recalled.
    pub const GOOD: ReviewScore = ReviewScore(3);
    /// Recalled instantly.
    pub const EASY: ReviewScore = ReviewScore(4);

    /// Validate a raw score.
    pub fn new(score: u8) -> ReviewResult<Self> {
        if (1..=4).contains(&score) {
            Ok(Self(score))
        } else {
            Err(ReviewError::InvalidScore { score })
        }
    }

    /// Raw value sent to the server.
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Days until the next review, as scheduled by the server.
    pub fn interval_days(&self) -> u32 {
        match self.0 {
            1 => 1,
            2 => 2,
            3 => 3,
            _ => 7,
        }
    }

    /// Button label.
    pub fn label(&self) -> &'static str {
        match self.0 {
            1 => "De novo",
            2 => "Difícil",
            3 => "Bom",
            _ => "Fácil",
        }
    }
}

impl TryFrom<u8> for ReviewScore {
    type Error = ReviewError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ReviewScore> for u8 {
    fn from(score: ReviewScore) -> Self {
        score.0
    }
}

impl std::fmt::Display for ReviewScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.0, self.label())
    }
}

impl std::str::FromStr for ReviewScore {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let score = input
            .parse::<u8>()
            .map_err(|_| ReviewError::UnparsableScore {
                input: input.to_string(),
            })?;
        Self::new(score)
    }
}

/// Backend operations a review session needs.
#[async_trait]
pub trait ReviewBackend: Send + Sync {
    /// Cards due now.
    async fn due_cards(&self) -> ApiResult<Vec<DueCard>>;
    /// Submit a score for one card.
    async fn submit_review(&self, card_id: i64, score: ReviewScore) -> ApiResult<ReviewAck>;
}

#[async_trait]
impl ReviewBackend for ApiClient {
    async fn due_cards(&self) -> ApiResult<Vec<DueCard>> {
        ApiClient::due_cards(self).await
    }

    async fn submit_review(&self, card_id: i64, score: ReviewScore) -> ApiResult<ReviewAck> {
        ApiClient::submit_review(self, card_id, score.value()).await
    }
}

/// Result of a successful rating.
#[derive(Debug, Clone, PartialEq)]
pub enum RateOutcome {
    /// The next card is now current.
    Advanced { ack: ReviewAck },
    /// That was the last card.
    Finished { ack: ReviewAck },
}

impl RateOutcome {
    /// Server acknowledgement.
    pub fn ack(&self) -> &ReviewAck {
        match self {
            RateOutcome::Advanced { ack } | RateOutcome::Finished { ack } => ack,
        }
    }

    /// Whether the queue is done.
    pub fn is_finished(&self) -> bool {
        matches!(self, RateOutcome::Finished { .. })
    }
}

/// Ordered queue of due cards with a moving cursor.
#[derive(Debug, Clone, Default)]
pub struct ReviewQueue {
    cards: Vec<DueCard>,
    index: usize,
    last_error: Option<String>,
}

impl ReviewQueue {
    /// Queue over cards in server order.
    pub fn new(cards: Vec<DueCard>) -> Self {
        Self {
            cards,
            index: 0,
            last_error: None,
        }
    }

    /// Fetch the due cards and build a queue.
    pub async fn load<B: ReviewBackend + ?Sized>(backend: &B) -> ApiResult<Self> {
        let cards = backend.due_cards().await?;
        info!(cards = cards.len(), "Review queue loaded");
        Ok(Self::new(cards))
    }

    /// Card awaiting a rating.
    pub fn current(&self) -> Option<&DueCard> {
        self.cards.get(self.index)
    }

    /// Cards not yet rated, current first.
    pub fn remaining(&self) -> &[DueCard] {
        self.cards.get(self.index..).unwrap_or(&[])
    }

    /// Number of cards rated so far.
    pub fn rated(&self) -> usize {
        self.index.min(self.cards.len())
    }

    /// Total cards in the session.
    pub fn total(&self) -> usize {
        self.cards.len()
    }

    /// Whether every card has been rated.
    pub fn is_finished(&self) -> bool {
        self.index >= self.cards.len()
    }

    /// Message from the last failed rating, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Rate the current card.
    ///
    /// `card_id` must be the current card's id. On success the cursor moves
    /// past it; on failure the queue is left as it was and the error is kept
    /// in [`ReviewQueue::last_error`].
    pub async fn rate<B: ReviewBackend + ?Sized>(
        &mut self,
        backend: &B,
        card_id: i64,
        score: ReviewScore,
    ) -> ReviewResult<RateOutcome> {
        let current = self.current().ok_or(ReviewError::QueueExhausted)?;
        if current.id != card_id {
            return Err(ReviewError::CardMismatch {
                expected: current.id,
                got: card_id,
            });
        }

        match backend.submit_review(card_id, score).await {
            Ok(ack) => {
                self.index += 1;
                self.last_error = None;
                debug!(
                    card_id,
                    score = score.value(),
                    retention_level = ack.retention_level,
                    remaining = self.remaining().len(),
                    "Review accepted"
                );
                if self.is_finished() {
                    info!(cards = self.cards.len(), "Review session finished");
                    Ok(RateOutcome::Finished { ack })
                } else {
                    Ok(RateOutcome::Advanced { ack })
                }
            }
            Err(e) => {
                warn!(card_id, error = %e, "Review submission failed");
                self.last_error = Some(e.user_message());
                Err(ReviewError::Api(e))
            }
        }
    }
}
