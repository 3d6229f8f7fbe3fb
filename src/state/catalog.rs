//! Immutable card catalog loaded once at startup.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::dao::models::ALL_DECK;

/// Significance threshold used when a record does not state its outcome explicitly.
const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Failures raised while loading or validating the catalog. All of them are fatal.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file cannot be read.
    #[error("failed to read card catalog `{path}`")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The catalog is not valid JSON.
    #[error("failed to parse card catalog")]
    Parse(#[source] serde_json::Error),
    /// The catalog has no cards.
    #[error("card catalog is empty")]
    Empty,
    /// Two cards share an id.
    #[error("duplicate card id `{0}` in catalog")]
    DuplicateCard(String),
    /// A p-value comparator is not recognized.
    #[error("card `{id}` has unknown p-value comparator `{comparator}`")]
    UnknownComparator { id: String, comparator: String },
    /// A card states neither its outcome nor a p-value.
    #[error("card `{0}` has neither a success flag nor a p-value")]
    MissingOutcome(String),
}

/// Question fragments rendered by the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Question {
    /// Intervention under trial.
    pub intervention: String,
    /// Primary outcome the trial measured.
    pub outcome: String,
    /// Studied population, when the record names one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population: Option<String>,
}

/// Reported p-value of the primary outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PValue {
    /// Comparator as published, e.g. `<` or `=`.
    pub comparator: String,
    /// Numeric value.
    pub value: f64,
}

/// Descriptive metadata revealed alongside the outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CardMetadata {
    /// Number of enrolled participants.
    #[serde(default)]
    pub participants: Option<u32>,
    /// Reported p-value.
    #[serde(default)]
    pub p_value: Option<PValue>,
    /// Source reference, typically a registry id.
    #[serde(default)]
    pub source: Option<String>,
}

/// One yes/no question with its ground truth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    /// Trial registry identifier.
    pub id: String,
    /// Question fragments.
    pub question: Question,
    /// Whether the trial met its primary outcome.
    pub success: bool,
    /// Deck labels the card belongs to.
    pub decks: Vec<String>,
    /// Details revealed after answering.
    pub metadata: CardMetadata,
}

#[derive(Debug, Deserialize)]
struct RawCard {
    id: String,
    question: Question,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    decks: Vec<String>,
    #[serde(default)]
    metadata: CardMetadata,
}

impl TryFrom<RawCard> for Card {
    type Error = CatalogError;

    fn try_from(raw: RawCard) -> Result<Self, Self::Error> {
        let success = match (raw.success, raw.metadata.p_value.as_ref()) {
            (Some(success), _) => success,
            (None, Some(p_value)) => significant(&raw.id, p_value)?,
            (None, None) => return Err(CatalogError::MissingOutcome(raw.id)),
        };

        Ok(Card {
            id: raw.id,
            question: raw.question,
            success,
            decks: raw.decks,
            metadata: raw.metadata,
        })
    }
}

fn significant(id: &str, p_value: &PValue) -> Result<bool, CatalogError> {
    match p_value.comparator.trim() {
        "<" | "<=" | "=" | "≤" => Ok(p_value.value <= SIGNIFICANCE_LEVEL),
        ">" | ">=" | "≥" => Ok(false),
        other => Err(CatalogError::UnknownComparator {
            id: id.to_string(),
            comparator: other.to_string(),
        }),
    }
}

/// Deck context: the whole catalog or one labelled subset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Deck {
    /// Every card of the catalog.
    All,
    /// Cards listing the label.
    Named(String),
}

impl Deck {
    /// Parse a deck label; a missing or blank label and the `All` sentinel select everything.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            None | Some("") => Deck::All,
            Some(label) if label.eq_ignore_ascii_case(ALL_DECK) => Deck::All,
            Some(label) => Deck::Named(label.to_string()),
        }
    }

    /// Label used as the key of the deck stats map.
    pub fn label(&self) -> &str {
        match self {
            Deck::All => ALL_DECK,
            Deck::Named(label) => label,
        }
    }

    /// Whether `card` belongs to this deck.
    pub fn contains(&self, card: &Card) -> bool {
        match self {
            Deck::All => true,
            Deck::Named(label) => card.decks.iter().any(|deck| deck == label),
        }
    }
}

/// Ordered, validated list of cards.
#[derive(Debug, Clone)]
pub struct Catalog {
    cards: Vec<Card>,
}

impl Catalog {
    /// Validate an already built card list.
    pub fn from_cards(cards: Vec<Card>) -> Result<Self, CatalogError> {
        if cards.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::with_capacity(cards.len());
        for card in &cards {
            if !seen.insert(card.id.as_str()) {
                return Err(CatalogError::DuplicateCard(card.id.clone()));
            }
        }
        Ok(Self { cards })
    }

    /// Parse a JSON array of card records.
    pub fn from_json(contents: &str) -> Result<Self, CatalogError> {
        let raw: Vec<RawCard> = serde_json::from_str(contents).map_err(CatalogError::Parse)?;
        let cards = raw
            .into_iter()
            .map(Card::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_cards(cards)
    }

    /// Read and parse the catalog file at `path`.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Every card in catalog order.
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Card by identifier.
    pub fn get(&self, id: &str) -> Option<&Card> {
        self.cards.iter().find(|card| card.id == id)
    }

    /// Number of cards.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether the catalog has no cards.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Cards belonging to `deck`, in catalog order.
    pub fn in_deck<'a>(&'a self, deck: &'a Deck) -> impl Iterator<Item = &'a Card> + 'a {
        self.cards.iter().filter(move |card| deck.contains(card))
    }
}
