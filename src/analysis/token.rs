use serde::{Deserialize, Serialize};

use crate::api::LiteToken;

/// Token identifier shared by lite, deep and detail responses.
pub type TokenId = i64;

/// Grammatical case as reported by deep analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrammaticalCase {
    Nom,
    Akk,
    Dat,
    Gen,
    #[serde(rename = "?", other)]
    Unknown,
}

impl GrammaticalCase {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            GrammaticalCase::Nom => "Nom",
            GrammaticalCase::Akk => "Akk",
            GrammaticalCase::Dat => "Dat",
            GrammaticalCase::Gen => "Gen",
            GrammaticalCase::Unknown => "?",
        }
    }
}

impl std::fmt::Display for GrammaticalCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Syntactic role as reported by deep analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyntacticRole {
    Subject,
    Object,
    Modifier,
    #[serde(rename = "?", other)]
    Unknown,
}

impl SyntacticRole {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyntacticRole::Subject => "subject",
            SyntacticRole::Object => "object",
            SyntacticRole::Modifier => "modifier",
            SyntacticRole::Unknown => "?",
        }
    }
}

impl std::fmt::Display for SyntacticRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Merged view of one token.
///
/// Lexical fields come from lite analysis; grammatical fields appear once deep
/// analysis resolves; `word_id` appears once the legacy detail call resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub token_id: TokenId,
    #[serde(default)]
    pub surface: Option<String>,
    pub lemma: String,
    pub pos: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub case: Option<GrammaticalCase>,
    #[serde(default)]
    pub syntactic_role: Option<SyntacticRole>,
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Durable word entity, needed for flashcard generation.
    #[serde(default)]
    pub word_id: Option<i64>,
    #[serde(default)]
    pub position: Option<u32>,
}

impl Token {
    /// Whether deep analysis has filled the grammatical fields.
    pub fn has_grammar(&self) -> bool {
        self.case.is_some() || self.syntactic_role.is_some()
    }

    /// Surface form when known, lemma otherwise.
    pub fn display_form(&self) -> &str {
        self.surface.as_deref().unwrap_or(&self.lemma)
    }
}

impl From<LiteToken> for Token {
    fn from(lite: LiteToken) -> Self {
        Self {
            token_id: lite.token_id,
            surface: lite.surface,
            lemma: lite.lemma,
            pos: lite.pos,
            gender: lite.gender,
            case: None,
            syntactic_role: None,
            confidence: None,
            word_id: None,
            position: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrecognized_case_maps_to_unknown() {
        let case: GrammaticalCase = serde_json::from_str("\"Vok\"").unwrap();
        assert_eq!(case, GrammaticalCase::Unknown);
        assert_eq!(serde_json::to_string(&GrammaticalCase::Unknown).unwrap(), "\"?\"");
    }

    #[test]
    fn test_role_names() {
        let role: SyntacticRole = serde_json::from_str("\"object\"").unwrap();
        assert_eq!(role, SyntacticRole::Object);
        assert_eq!(SyntacticRole::Modifier.to_string(), "modifier");
    }

    #[test]
    fn test_from_lite_leaves_grammar_empty() {
        let token = Token::from(LiteToken {
            token_id: 1,
            surface: None,
            lemma: "Patient".to_string(),
            pos: "NOUN".to_string(),
            gender: Some("M".to_string()),
        });

        assert!(!token.has_grammar());
        assert!(token.word_id.is_none());
        assert_eq!(token.display_form(), "Patient");
    }
}
