//! Schema constraint declarations
//!
//! Declarations are parsed into a tagged `Constraint` so edition filtering
//! looks at the constraint kind, not at the declaration's formatting.
//! Accepted forms:
//!
//! ```text
//! CREATE CONSTRAINT [name] [IF NOT EXISTS] FOR|ON (v:Label)
//!     REQUIRE|ASSERT v.p | (v.a, v.b) IS UNIQUE | NODE KEY | NOT NULL
//! CREATE CONSTRAINT [name] [IF NOT EXISTS] ON (v:Label) ASSERT exists(v.p)
//! ```

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Target store edition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreEdition {
    #[default]
    Community,
    Enterprise,
}

impl StoreEdition {
    pub fn supports(self, kind: ConstraintKind) -> bool {
        match self {
            Self::Enterprise => true,
            Self::Community => kind == ConstraintKind::Unique,
        }
    }
}

impl FromStr for StoreEdition {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "community" => Ok(Self::Community),
            "enterprise" => Ok(Self::Enterprise),
            _ => Err(format!("unknown store edition: {}", s)),
        }
    }
}

impl std::fmt::Display for StoreEdition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Community => f.write_str("community"),
            Self::Enterprise => f.write_str("enterprise"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    NodeKey,
    Exists,
}

impl ConstraintKind {
    fn clause(self) -> &'static str {
        match self {
            Self::Unique => "UNIQUE",
            Self::NodeKey => "NODE KEY",
            Self::Exists => "NOT NULL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot parse constraint '{declaration}': {reason}")]
pub struct ConstraintError {
    pub declaration: String,
    pub reason: String,
}

/// A parsed node constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub name: Option<String>,
    pub kind: ConstraintKind,
    pub variable: String,
    pub label: String,
    pub properties: Vec<String>,
}

/// Declarations every script carries.
pub const DEFAULT_CONSTRAINTS: [&str; 6] = [
    "CREATE CONSTRAINT work_base_id IF NOT EXISTS FOR (w:Work) REQUIRE w.baseId IS UNIQUE",
    "CREATE CONSTRAINT segment_id IF NOT EXISTS FOR (s:Segment) REQUIRE s.segmentId IS UNIQUE",
    "CREATE CONSTRAINT sentence_id IF NOT EXISTS FOR (n:Sentence) REQUIRE n.sentenceId IS UNIQUE",
    "CREATE CONSTRAINT entity_id IF NOT EXISTS FOR (e:Entity) REQUIRE e.entityId IS UNIQUE",
    "CREATE CONSTRAINT tag_catalog_key IF NOT EXISTS FOR (t:TagCatalog) REQUIRE (t.scheme, t.code) IS NODE KEY",
    "CREATE CONSTRAINT work_title_exists IF NOT EXISTS FOR (w:Work) REQUIRE w.title IS NOT NULL",
];

/// Parse the built-in declarations.
pub fn default_constraints() -> Vec<Constraint> {
    DEFAULT_CONSTRAINTS
        .iter()
        .filter_map(|decl| Constraint::parse(decl).ok())
        .collect()
}

impl Constraint {
    pub fn parse(declaration: &str) -> Result<Self, ConstraintError> {
        Parser::new(declaration)?.constraint()
    }

    /// Canonical one-line declaration.
    pub fn render(&self) -> String {
        let name = self
            .name
            .as_ref()
            .map(|n| format!("{} ", quote(n)))
            .unwrap_or_default();
        let props: Vec<String> = self
            .properties
            .iter()
            .map(|p| format!("{}.{}", quote(&self.variable), quote(p)))
            .collect();
        let target = if props.len() == 1 {
            props[0].clone()
        } else {
            format!("({})", props.join(", "))
        };
        format!(
            "CREATE CONSTRAINT {}IF NOT EXISTS FOR ({}:{}) REQUIRE {} IS {};",
            name,
            quote(&self.variable),
            quote(&self.label),
            target,
            self.kind.clause()
        )
    }

    /// Passive marker emitted in place of an unsupported declaration.
    pub fn skipped_marker(&self, edition: StoreEdition) -> String {
        format!(
            "// skipped {} constraint on :{}({}) unsupported by {} edition",
            self.kind.clause(),
            self.label,
            self.properties.join(", "),
            edition
        )
    }
}

fn quote(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        name.to_string()
    } else {
        format!("`{}`", name.replace('`', "``"))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Punct(char),
}

struct Parser<'a> {
    declaration: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(declaration: &'a str) -> Result<Self, ConstraintError> {
        let mut tokens = Vec::new();
        let mut chars = declaration.chars().peekable();
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() {
                chars.next();
            } else if c == '`' {
                chars.next();
                let mut word = String::new();
                loop {
                    match chars.next() {
                        Some('`') if chars.peek() == Some(&'`') => {
                            chars.next();
                            word.push('`');
                        }
                        Some('`') => break,
                        Some(c) => word.push(c),
                        None => {
                            return Err(ConstraintError {
                                declaration: declaration.to_string(),
                                reason: "unterminated quoted name".into(),
                            })
                        }
                    }
                }
                tokens.push(Token::Word(word));
            } else if c.is_alphanumeric() || c == '_' {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        word.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Word(word));
            } else {
                tokens.push(Token::Punct(c));
                chars.next();
            }
        }
        while tokens.last() == Some(&Token::Punct(';')) {
            tokens.pop();
        }
        Ok(Self {
            declaration,
            tokens,
            pos: 0,
        })
    }

    fn error(&self, reason: impl Into<String>) -> ConstraintError {
        ConstraintError {
            declaration: self.declaration.to_string(),
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword))
    }

    fn keyword(&mut self, keyword: &str) -> Result<(), ConstraintError> {
        if self.peek_keyword(keyword) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected {}", keyword)))
        }
    }

    fn punct(&mut self, c: char) -> Result<(), ConstraintError> {
        if self.peek() == Some(&Token::Punct(c)) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", c)))
        }
    }

    fn word(&mut self) -> Result<String, ConstraintError> {
        match self.peek() {
            Some(Token::Word(w)) => {
                let w = w.clone();
                self.pos += 1;
                Ok(w)
            }
            _ => Err(self.error("expected a name")),
        }
    }

    fn constraint(mut self) -> Result<Constraint, ConstraintError> {
        self.keyword("CREATE")?;
        self.keyword("CONSTRAINT")?;

        let name = if ["FOR", "ON", "IF"].iter().any(|k| self.peek_keyword(k)) {
            None
        } else {
            Some(self.word()?)
        };
        if self.peek_keyword("IF") {
            self.keyword("IF")?;
            self.keyword("NOT")?;
            self.keyword("EXISTS")?;
        }
        if self.peek_keyword("FOR") {
            self.keyword("FOR")?;
        } else {
            self.keyword("ON")?;
        }

        self.punct('(')?;
        let variable = self.word()?;
        self.punct(':')?;
        let label = self.word()?;
        self.punct(')')?;

        if self.peek_keyword("REQUIRE") {
            self.keyword("REQUIRE")?;
        } else {
            self.keyword("ASSERT")?;
        }

        if self.peek_keyword("exists") {
            self.keyword("exists")?;
            self.punct('(')?;
            let property = self.property(&variable)?;
            self.punct(')')?;
            return self.finish(Constraint {
                name,
                kind: ConstraintKind::Exists,
                variable,
                label,
                properties: vec![property],
            });
        }

        let properties = if self.peek() == Some(&Token::Punct('(')) {
            self.punct('(')?;
            let mut props = vec![self.property(&variable)?];
            while self.peek() == Some(&Token::Punct(',')) {
                self.punct(',')?;
                props.push(self.property(&variable)?);
            }
            self.punct(')')?;
            props
        } else {
            vec![self.property(&variable)?]
        };

        self.keyword("IS")?;
        let kind = if self.peek_keyword("UNIQUE") {
            self.keyword("UNIQUE")?;
            ConstraintKind::Unique
        } else if self.peek_keyword("NODE") {
            self.keyword("NODE")?;
            self.keyword("KEY")?;
            ConstraintKind::NodeKey
        } else {
            self.keyword("NOT")?;
            self.keyword("NULL")?;
            ConstraintKind::Exists
        };

        self.finish(Constraint {
            name,
            kind,
            variable,
            label,
            properties,
        })
    }

    fn property(&mut self, variable: &str) -> Result<String, ConstraintError> {
        let owner = self.word()?;
        if owner != variable {
            return Err(self.error(format!("property owner '{}' is not '{}'", owner, variable)));
        }
        self.punct('.')?;
        self.word()
    }

    fn finish(&self, constraint: Constraint) -> Result<Constraint, ConstraintError> {
        match self.peek() {
            None => Ok(constraint),
            Some(_) => Err(self.error("unexpected trailing input")),
        }
    }
}
