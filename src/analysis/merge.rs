//! Keyed merge of token data arriving from independent sources.
//!
//! Lite analysis defines the rows; deep analysis and the legacy detail call
//! are column-upsert passes over those rows, keyed by token id. A pass never
//! adds or reorders rows.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::token::{Token, TokenId};
use crate::api::{DeepToken, DetailToken, LiteToken};

/// A partial update for one token row.
pub trait TokenPatch {
    /// Token id this patch targets.
    fn key(&self) -> TokenId;

    /// Override the fields this source knows about.
    fn apply_to(&self, token: &mut Token);
}

impl TokenPatch for DeepToken {
    fn key(&self) -> TokenId {
        self.token_id
    }

    fn apply_to(&self, token: &mut Token) {
        token.surface = Some(self.surface.clone());
        token.lemma = self.lemma.clone();
        token.pos = self.pos.clone();
        if let Some(gender) = &self.gender {
            token.gender = Some(gender.clone());
        }
        token.case = Some(self.case);
        token.syntactic_role = Some(self.syntactic_role);
        token.confidence = Some(self.confidence);
    }
}

impl TokenPatch for DetailToken {
    fn key(&self) -> TokenId {
        self.id
    }

    fn apply_to(&self, token: &mut Token) {
        token.word_id = Some(self.word.id);
        if let Some(position) = self.position {
            token.position = Some(position);
        }
    }
}

/// Merge `overlay` into a copy of `base`.
///
/// Produces one entry per base token in base order. A base token whose key
/// has an overlay entry gets that entry's fields; others pass through
/// unchanged. Overlay entries with no base token are dropped. When the overlay
/// repeats a key, the last entry wins.
pub fn merge<O, K>(base: &[Token], overlay: &[O], key_fn: K) -> Vec<Token>
where
    O: TokenPatch,
    K: Fn(&O) -> TokenId,
{
    let mut merged = base.to_vec();
    apply_overlay(&mut merged, overlay, key_fn);
    merged
}

fn apply_overlay<O, K>(rows: &mut [Token], overlay: &[O], key_fn: K) -> usize
where
    O: TokenPatch,
    K: Fn(&O) -> TokenId,
{
    let index: HashMap<TokenId, &O> = overlay.iter().map(|o| (key_fn(o), o)).collect();

    let mut matched = 0;
    for row in rows.iter_mut() {
        if let Some(patch) = index.get(&row.token_id) {
            patch.apply_to(row);
            matched += 1;
        }
    }
    matched
}

/// Ordered token rows keyed by token id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenTable {
    rows: Vec<Token>,
}

impl TokenTable {
    /// Build the base rows from a lite analysis response.
    pub fn from_lite(tokens: Vec<LiteToken>) -> Self {
        Self {
            rows: tokens.into_iter().map(Token::from).collect(),
        }
    }

    /// Apply one source's patches; returns how many rows were touched.
    pub fn upsert<P: TokenPatch>(&mut self, patches: &[P]) -> usize {
        apply_overlay(&mut self.rows, patches, P::key)
    }

    /// Rows in lite order.
    pub fn rows(&self) -> &[Token] {
        &self.rows
    }

    /// Row for a token id.
    pub fn get(&self, token_id: TokenId) -> Option<&Token> {
        self.rows.iter().find(|t| t.token_id == token_id)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Take the rows.
    pub fn into_rows(self) -> Vec<Token> {
        self.rows
    }
}
