//! Unit tests for storage record types.

use super::*;
use crate::analysis::AnalysisEvent;
use chrono::TimeZone;

fn due_card() -> DueCard {
    DueCard {
        id: 5,
        word_token_id: Some(12),
        word: "Patient".to_string(),
        challenge_pt: "O paciente está inconsciente.".to_string(),
        nivel_c1: vec![],
        context_original: String::new(),
        variacao_nativa: String::new(),
        next_review_at: None,
    }
}

#[test]
fn test_record_from_fresh_session() {
    let record = AnalysisRecord::from_session(&AnalysisSession::new());

    assert!(!record.id.is_empty());
    assert_eq!(record.phase, AnalysisPhase::Idle);
    assert_eq!(record.phrase_hash, PhraseHash::of(""));
    assert!(record.tokens.is_empty());
    assert!(!record.is_complete());
}

#[test]
fn test_record_from_failed_session() {
    let session = AnalysisSession::new()
        .step(AnalysisEvent::Trigger {
            phrase: " ".to_string(),
        })
        .state;

    let record = AnalysisRecord::from_session(&session);

    assert_eq!(record.phase, AnalysisPhase::Error);
    assert!(record.error.is_some());
    assert!(record.document_id.is_none());
}

#[test]
fn test_record_ids_are_unique() {
    let session = AnalysisSession::new();
    let a = AnalysisRecord::from_session(&session);
    let b = AnalysisRecord::from_session(&session);
    assert_ne!(a.id, b.id);
}

#[test]
fn test_review_entry_from_ack() {
    let ack = ReviewAck {
        id: 5,
        retention_level: 3,
        next_review_at: Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(),
    };

    let entry = ReviewLogEntry::from_ack(&due_card(), ReviewScore::GOOD, &ack);

    assert_eq!(entry.card_id, 5);
    assert_eq!(entry.word, "Patient");
    assert_eq!(entry.score, ReviewScore::GOOD);
    assert_eq!(entry.retention_level, 3);
    assert_eq!(entry.next_review_at, ack.next_review_at);
}

#[test]
fn test_record_serializes_phase_in_snake_case() {
    let record = AnalysisRecord::from_session(&AnalysisSession::new());
    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["phase"], "idle");
}
