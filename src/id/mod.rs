//! Hierarchical work identifiers
//!
//! Every unit of an ingested document carries an identifier of the form
//!
//! ```text
//! {base}_{date}_{millis}[_{token}]*
//! ```
//!
//! - `base`: 8 characters from `A-Z0-9`, shared by the whole lineage
//! - `date`: `YYYYMMDD` of the Work's mint time, shared by the whole lineage
//! - `millis`: Unix milliseconds, minted fresh for every identifier
//! - `token`: level prefix plus zero-padded ordinal (`S0001`, `N0001`, `E00001`, `T001`)
//!
//! Parsing needs no external state: the level is recovered from token shape alone.

mod clock;
mod generator;

pub use clock::{Clock, FixedClock, SystemClock};
pub use generator::{BaseMode, CounterTable, IdGenerator};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Length of the lineage base token.
pub const BASE_LEN: usize = 8;

/// Separator between identifier components.
pub const SEPARATOR: char = '_';

pub(crate) const DATE_FORMAT: &str = "%Y%m%d";

/// Errors raised while minting or parsing identifiers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("Malformed identifier '{id}': {reason}")]
    Malformed { id: String, reason: String },

    #[error("Identifier carries no ordinal: {0}")]
    NoOrdinal(String),

    #[error("{level} ordinal {ordinal} exceeds the {width}-digit width")]
    Overflow {
        level: IdLevel,
        ordinal: u32,
        width: usize,
    },

    #[error("Identifier collision: {0} was already minted")]
    Collision(String),

    #[error("Cannot mint a {child} identifier under a {parent}")]
    InvalidParent { parent: IdLevel, child: IdLevel },
}

impl IdError {
    fn malformed(id: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for identifier operations
pub type IdResult<T> = Result<T, IdError>;

/// The kind of unit an identifier names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdLevel {
    Work,
    Segment,
    Sentence,
    Entity,
    Tag,
}

impl IdLevel {
    /// Token prefix letter; Work IDs carry no token.
    pub fn prefix(self) -> Option<char> {
        match self {
            Self::Work => None,
            Self::Segment => Some('S'),
            Self::Sentence => Some('N'),
            Self::Entity => Some('E'),
            Self::Tag => Some('T'),
        }
    }

    /// Number of ordinal digits in the token.
    pub fn width(self) -> usize {
        match self {
            Self::Work => 0,
            Self::Segment | Self::Sentence => 4,
            Self::Entity => 5,
            Self::Tag => 3,
        }
    }

    /// Largest ordinal that fits the token width.
    pub fn max_ordinal(self) -> u32 {
        10u32.pow(self.width() as u32).saturating_sub(1)
    }

    /// Hierarchy depth: Work = 0, Segment = 1, Sentence/Entity/Tag = 2.
    pub fn depth(self) -> u8 {
        match self {
            Self::Work => 0,
            Self::Segment => 1,
            Self::Sentence | Self::Entity | Self::Tag => 2,
        }
    }

    fn from_prefix(c: char) -> Option<Self> {
        match c {
            'S' => Some(Self::Segment),
            'N' => Some(Self::Sentence),
            'E' => Some(Self::Entity),
            'T' => Some(Self::Tag),
            _ => None,
        }
    }

    /// Whether an identifier of this level may parent one of `child`.
    pub fn accepts_child(self, child: IdLevel) -> bool {
        matches!(
            (self, child),
            (Self::Work, Self::Segment | Self::Entity | Self::Tag) | (Self::Segment, Self::Sentence)
        )
    }
}

impl std::fmt::Display for IdLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Work => "work",
            Self::Segment => "segment",
            Self::Sentence => "sentence",
            Self::Entity => "entity",
            Self::Tag => "tag",
        };
        f.write_str(name)
    }
}

impl FromStr for IdLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "work" => Ok(Self::Work),
            "segment" => Ok(Self::Segment),
            "sentence" => Ok(Self::Sentence),
            "entity" => Ok(Self::Entity),
            "tag" => Ok(Self::Tag),
            _ => Err(format!("unknown identifier level: {}", s)),
        }
    }
}

/// A level token: prefix letter plus zero-padded ordinal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LevelToken {
    pub level: IdLevel,
    pub ordinal: u32,
}

impl LevelToken {
    /// Build a token, rejecting Work (no token) and ordinals wider than the level allows.
    pub fn new(level: IdLevel, ordinal: u32) -> IdResult<Self> {
        if level == IdLevel::Work {
            return Err(IdError::InvalidParent {
                parent: IdLevel::Work,
                child: IdLevel::Work,
            });
        }
        if ordinal > level.max_ordinal() {
            return Err(IdError::Overflow {
                level,
                ordinal,
                width: level.width(),
            });
        }
        Ok(Self { level, ordinal })
    }

    fn parse(raw: &str) -> Option<Self> {
        let mut chars = raw.chars();
        let level = IdLevel::from_prefix(chars.next()?)?;
        let digits = chars.as_str();
        if digits.len() != level.width() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self {
            level,
            ordinal: digits.parse().ok()?,
        })
    }
}

impl std::fmt::Display for LevelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = self.level.prefix().unwrap_or('?');
        write!(f, "{}{:0width$}", prefix, self.ordinal, width = self.level.width())
    }
}

/// A structured identifier string
///
/// Serializes as a plain string. Constructing one through `FromStr`
/// validates the shape; the generator builds them directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    pub(crate) fn from_parts(parts: &ParsedId) -> Self {
        let mut id = format!(
            "{}{sep}{}{sep}{}",
            parts.base,
            parts.date.format(DATE_FORMAT),
            parts.timestamp_ms,
            sep = SEPARATOR
        );
        for token in &parts.tokens {
            id.push(SEPARATOR);
            id.push_str(&token.to_string());
        }
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Parse into components.
    pub fn parse(&self) -> IdResult<ParsedId> {
        parse(&self.0)
    }

    /// The lineage base token (everything before the first separator).
    pub fn work_base(&self) -> &str {
        work_base(&self.0)
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Identifier {
    type Err = IdError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)?;
        Ok(Self(s.to_string()))
    }
}

/// Components recovered from an identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedId {
    pub base: String,
    pub date: NaiveDate,
    pub timestamp_ms: i64,
    /// Level tokens from the Work downwards; empty for a Work ID
    pub tokens: Vec<LevelToken>,
}

impl ParsedId {
    /// The unit type named by the identifier.
    pub fn kind(&self) -> IdLevel {
        self.tokens.last().map(|t| t.level).unwrap_or(IdLevel::Work)
    }

    /// Hierarchy depth of the named unit.
    pub fn level(&self) -> u8 {
        self.kind().depth()
    }

    /// Ordinal of the last token, if any.
    pub fn ordinal(&self) -> Option<u32> {
        self.tokens.last().map(|t| t.ordinal)
    }

    /// Lineage key: base token and date.
    pub fn lineage(&self) -> (&str, NaiveDate) {
        (&self.base, self.date)
    }
}

/// Parse an identifier string into its components.
pub fn parse(id: &str) -> IdResult<ParsedId> {
    let mut parts = id.split(SEPARATOR);

    let base = parts.next().unwrap_or_default();
    if base.len() != BASE_LEN
        || !base
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    {
        return Err(IdError::malformed(
            id,
            format!("base must be {} characters of A-Z0-9", BASE_LEN),
        ));
    }

    let date_raw = parts
        .next()
        .ok_or_else(|| IdError::malformed(id, "missing date component"))?;
    if date_raw.len() != 8 || !date_raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(IdError::malformed(id, "date must be YYYYMMDD"));
    }
    let date = NaiveDate::parse_from_str(date_raw, DATE_FORMAT)
        .map_err(|e| IdError::malformed(id, format!("invalid date: {}", e)))?;

    let millis_raw = parts
        .next()
        .ok_or_else(|| IdError::malformed(id, "missing timestamp component"))?;
    if millis_raw.is_empty() || !millis_raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(IdError::malformed(id, "timestamp must be decimal milliseconds"));
    }
    let timestamp_ms: i64 = millis_raw
        .parse()
        .map_err(|_| IdError::malformed(id, "timestamp out of range"))?;

    let mut tokens = Vec::new();
    let mut parent = IdLevel::Work;
    for raw in parts {
        let token = LevelToken::parse(raw)
            .ok_or_else(|| IdError::malformed(id, format!("unrecognized level token '{}'", raw)))?;
        if !parent.accepts_child(token.level) {
            return Err(IdError::malformed(
                id,
                format!("{} token cannot follow {}", token.level, parent),
            ));
        }
        parent = token.level;
        tokens.push(token);
    }

    Ok(ParsedId {
        base: base.to_string(),
        date,
        timestamp_ms,
        tokens,
    })
}

/// Hierarchy depth of an identifier (Work = 0, Segment = 1, Sentence/Entity/Tag = 2).
pub fn hierarchy_level(id: &str) -> IdResult<u8> {
    Ok(parse(id)?.level())
}

/// Whether two identifiers share base token and date.
///
/// Malformed identifiers belong to no lineage and never match.
pub fn same_lineage(a: &str, b: &str) -> bool {
    match (parse(a), parse(b)) {
        (Ok(a), Ok(b)) => a.lineage() == b.lineage(),
        _ => false,
    }
}

/// The sortable ordinal of an identifier's last level token.
pub fn ordinal(id: &str) -> IdResult<u32> {
    parse(id)?
        .ordinal()
        .ok_or_else(|| IdError::NoOrdinal(id.to_string()))
}

/// Parse and require a specific unit type.
pub(crate) fn expect_level(id: &str, level: IdLevel) -> IdResult<ParsedId> {
    let parsed = parse(id)?;
    if parsed.kind() != level {
        return Err(IdError::malformed(
            id,
            format!("expected a {} identifier, found {}", level, parsed.kind()),
        ));
    }
    Ok(parsed)
}

/// Substring before the first separator; the whole string when there is none.
pub fn work_base(id: &str) -> &str {
    id.split(SEPARATOR).next().unwrap_or(id)
}
