//! Unit tests for backend wire types.
//!
//! Covers deserialization of the shapes the backend actually emits,
//! including optional and unknown fields.

use super::*;
use crate::analysis::{GrammaticalCase, SyntacticRole};
use serde_json::json;

#[test]
fn test_lite_token_without_gender() {
    let token: LiteToken = serde_json::from_value(json!({
        "token_id": 7,
        "lemma": "sein",
        "pos": "AUX"
    }))
    .unwrap();

    assert_eq!(token.token_id, 7);
    assert_eq!(token.lemma, "sein");
    assert!(token.gender.is_none());
    assert!(token.surface.is_none());
}

#[test]
fn test_deep_token_with_unknown_case() {
    let token: DeepToken = serde_json::from_value(json!({
        "token_id": 3,
        "surface": "ist",
        "lemma": "sein",
        "pos": "AUX",
        "gender": null,
        "case": "?",
        "syntactic_role": "?",
        "confidence": 0.41
    }))
    .unwrap();

    assert_eq!(token.case, GrammaticalCase::Unknown);
    assert_eq!(token.syntactic_role, SyntacticRole::Unknown);
    assert!((token.confidence - 0.41).abs() < f64::EPSILON);
}

#[test]
fn test_deep_token_nominative_subject() {
    let token: DeepToken = serde_json::from_value(json!({
        "token_id": 2,
        "surface": "Patient",
        "lemma": "Patient",
        "pos": "NOUN",
        "gender": "M",
        "case": "Nom",
        "syntactic_role": "subject",
        "confidence": 0.93
    }))
    .unwrap();

    assert_eq!(token.case, GrammaticalCase::Nom);
    assert_eq!(token.syntactic_role, SyntacticRole::Subject);
    assert_eq!(token.gender.as_deref(), Some("M"));
}

#[test]
fn test_document_detail_shape() {
    let detail: DocumentDetail = serde_json::from_value(json!({
        "document": {
            "id": 42,
            "created_by": 1,
            "title": "Texto em alemão",
            "raw_text": "Der Patient ist bewusstlos.",
            "complexity_score": "12.50",
            "created_at": "2024-03-01T10:00:00.123456Z"
        },
        "tokens": [
            {
                "id": 1,
                "text_document": 42,
                "word_token": 11,
                "word": {"id": 11, "lemma": "der", "pos_tag": "DET", "gender": "X"},
                "position": 0,
                "grammatical_case": "NOM"
            }
        ]
    }))
    .unwrap();

    assert_eq!(detail.document.id, 42);
    assert!(detail.document.created_at.is_some());
    assert_eq!(detail.tokens.len(), 1);
    assert_eq!(detail.tokens[0].word.id, 11);
    assert_eq!(detail.tokens[0].position, Some(0));
}

#[test]
fn test_study_plan_with_empty_llm_result() {
    let plan: StudyPlan = serde_json::from_value(json!({
        "document_id": 42,
        "study_items_count": 0,
        "items": [],
        "llm_result": {"items": []}
    }))
    .unwrap();

    assert_eq!(plan.study_items_count, 0);
    assert_eq!(plan.llm_result, FlashcardContent::default());
}

#[test]
fn test_study_plan_with_flashcard() {
    let plan: StudyPlan = serde_json::from_value(json!({
        "document_id": 42,
        "study_items_count": 1,
        "items": [{
            "relation_id": 2,
            "word_token_id": 12,
            "lemma": "Patient",
            "pos_tag": "NOUN",
            "gender": "M",
            "grammatical_case": "NOM",
            "surface_form": "Patient",
            "dependency": "sb",
            "context_sentence": "Der Patient ist bewusstlos."
        }],
        "llm_result": {
            "analise_rapida": "Sujeito da frase.",
            "nivel_c1": ["der Erkrankte", "der Betroffene"],
            "variacao_nativa": "Pat. ist nicht ansprechbar.",
            "desafio_traducao": "O paciente está inconsciente.",
            "raw_content": "{}"
        }
    }))
    .unwrap();

    assert_eq!(plan.items[0].word_token_id, Some(12));
    assert_eq!(plan.llm_result.nivel_c1.len(), 2);
    assert_eq!(plan.llm_result.desafio_traducao, "O paciente está inconsciente.");
}

#[test]
fn test_due_card_list() {
    let cards: Vec<DueCard> = serde_json::from_value(json!([
        {
            "id": 5,
            "word_token_id": 12,
            "word": "Patient",
            "context_original": "Der Patient ist bewusstlos.",
            "challenge_pt": "O paciente está inconsciente.",
            "nivel_c1": ["der Erkrankte"],
            "variacao_nativa": "",
            "next_review_at": "2024-03-01T10:00:00Z"
        },
        {"id": 6, "word": "bewusstlos"}
    ]))
    .unwrap();

    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0].nivel_c1, vec!["der Erkrankte".to_string()]);
    assert!(cards[1].challenge_pt.is_empty());
    assert!(cards[1].next_review_at.is_none());
}

#[test]
fn test_review_ack() {
    let ack: ReviewAck = serde_json::from_value(json!({
        "id": 5,
        "retention_level": 4,
        "next_review_at": "2024-03-08T10:00:00Z"
    }))
    .unwrap();

    assert_eq!(ack.retention_level, 4);
}

#[test]
fn test_cefr_level_parsing() {
    assert_eq!("c1".parse::<CefrLevel>().unwrap(), CefrLevel::C1);
    assert_eq!(" B1 ".parse::<CefrLevel>().unwrap(), CefrLevel::B1);
    assert!("B2".parse::<CefrLevel>().is_err());
    assert_eq!(CefrLevel::A1.to_string(), "A1");
}

#[test]
fn test_generate_request_omits_missing_word() {
    let body = serde_json::to_value(GenerateFlashcardRequest {
        document_id: 42,
        word_id: None,
    })
    .unwrap();
    assert_eq!(body, json!({"document_id": 42}));
}

#[test]
fn test_csrf_response_field_name() {
    let response: CsrfResponse = serde_json::from_value(json!({"csrfToken": "abc"})).unwrap();
    assert_eq!(response.csrf_token.as_deref(), Some("abc"));

    let response: CsrfResponse = serde_json::from_value(json!({})).unwrap();
    assert!(response.csrf_token.is_none());
}
