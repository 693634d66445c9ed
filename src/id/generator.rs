//! IdGenerator: mints lineage-scoped identifiers
//!
//! The generator owns its counter table. Two generators in one process never
//! share ordinals; callers that share one generator serialize through `&mut`.

use super::clock::{Clock, SystemClock};
use super::{IdError, IdLevel, IdResult, Identifier, LevelToken, ParsedId, BASE_LEN};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

const ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Namespace for deriving semantic base tokens.
const BASE_NAMESPACE: Uuid = Uuid::from_u128(0x5b1e_9c3a_4f0d_4e27_a6c8_21d7_9e0b_3f64);

/// How Work-level base tokens are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseMode {
    /// Derived from title and source path; stable across runs
    #[default]
    Semantic,
    /// Drawn from the generator's random source
    Random,
}

/// Per-lineage ordinal counters and the ledger of minted identifiers.
#[derive(Debug, Default)]
pub struct CounterTable {
    /// (parent, child level) → last ordinal used
    counters: HashMap<(Identifier, IdLevel), u32>,
    /// lineage key (`base_date`) → identifiers minted under it
    issued: HashMap<String, HashSet<Identifier>>,
    /// minted identifier → the Work it descends from
    roots: HashMap<Identifier, Identifier>,
}

impl CounterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current counter value for `level` children of `parent` (0 if none minted).
    pub fn counter(&self, parent: &Identifier, level: IdLevel) -> u32 {
        self.counters
            .get(&(parent.clone(), level))
            .copied()
            .unwrap_or(0)
    }

    /// Number of identifiers minted under the lineage of `id`.
    pub fn lineage_len(&self, id: &Identifier) -> usize {
        id.parse()
            .ok()
            .and_then(|p| self.issued.get(&lineage_key(&p)))
            .map(HashSet::len)
            .unwrap_or(0)
    }

    /// The Work a minted identifier descends from.
    pub fn root_of(&self, id: &Identifier) -> Option<&Identifier> {
        self.roots.get(id)
    }

    fn register_work(&mut self, work: &Identifier) {
        for level in [IdLevel::Segment, IdLevel::Entity, IdLevel::Tag] {
            self.counters.entry((work.clone(), level)).or_insert(0);
        }
        self.roots.insert(work.clone(), work.clone());
    }

    /// Next ordinal for `level` under `parent`. The counter only advances on success.
    fn next_ordinal(&mut self, parent: &Identifier, level: IdLevel) -> IdResult<u32> {
        let counter = self.counters.entry((parent.clone(), level)).or_insert(0);
        let next = *counter + 1;
        if next > level.max_ordinal() {
            return Err(IdError::Overflow {
                level,
                ordinal: next,
                width: level.width(),
            });
        }
        *counter = next;
        Ok(next)
    }

    /// Keep automatic ordinals ahead of explicitly supplied ones.
    fn observe_ordinal(&mut self, parent: &Identifier, level: IdLevel, ordinal: u32) {
        let counter = self.counters.entry((parent.clone(), level)).or_insert(0);
        *counter = (*counter).max(ordinal);
    }

    fn record(&mut self, parsed: &ParsedId, id: &Identifier) -> IdResult<()> {
        let ledger = self.issued.entry(lineage_key(parsed)).or_default();
        if !ledger.insert(id.clone()) {
            return Err(IdError::Collision(id.to_string()));
        }
        Ok(())
    }
}

fn lineage_key(parsed: &ParsedId) -> String {
    format!("{}_{}", parsed.base, parsed.date.format(super::DATE_FORMAT))
}

/// Mints Work and child identifiers.
///
/// # Example
///
/// ```
/// use graphscribe::id::{hierarchy_level, BaseMode, IdGenerator, IdLevel};
///
/// let mut ids = IdGenerator::seeded(BaseMode::Random, 7);
/// let work = ids.new_work_id("Kokoro", "corpus/kokoro.txt").unwrap();
/// let segment = ids.new_child_id(&work, IdLevel::Segment, None).unwrap();
/// assert_eq!(hierarchy_level(segment.as_str()).unwrap(), 1);
/// ```
pub struct IdGenerator<R = StdRng> {
    mode: BaseMode,
    rng: R,
    clock: Box<dyn Clock>,
    table: CounterTable,
}

impl IdGenerator<StdRng> {
    /// Generator with an entropy-seeded random source and the system clock.
    pub fn new(mode: BaseMode) -> Self {
        Self::with_rng(mode, StdRng::from_entropy())
    }

    /// Generator whose random base tokens are reproducible.
    pub fn seeded(mode: BaseMode, seed: u64) -> Self {
        Self::with_rng(mode, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> IdGenerator<R> {
    pub fn with_rng(mode: BaseMode, rng: R) -> Self {
        Self {
            mode,
            rng,
            clock: Box::new(SystemClock),
            table: CounterTable::new(),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn mode(&self) -> BaseMode {
        self.mode
    }

    pub fn counters(&self) -> &CounterTable {
        &self.table
    }

    /// Mint a Work identifier and open its counter table entry.
    pub fn new_work_id(&mut self, title: &str, source_path: &str) -> IdResult<Identifier> {
        let base = match self.mode {
            BaseMode::Semantic => semantic_base(title, source_path),
            BaseMode::Random => self.random_base(),
        };
        let now = self.clock.now();
        let parsed = ParsedId {
            base,
            date: now.date_naive(),
            timestamp_ms: now.timestamp_millis().max(0),
            tokens: Vec::new(),
        };
        let id = Identifier::from_parts(&parsed);
        self.table.record(&parsed, &id)?;
        self.table.register_work(&id);
        tracing::debug!(id = %id, title, "minted work id");
        Ok(id)
    }

    /// Mint a child of `parent` at `level`.
    ///
    /// Without `explicit_index` the parent's counter for `level` advances by one.
    /// An explicit index leaves the counter at least that high so later
    /// automatic ordinals do not reuse it. Every call stamps a fresh timestamp;
    /// an identifier textually equal to one already minted is a collision.
    pub fn new_child_id(
        &mut self,
        parent: &Identifier,
        level: IdLevel,
        explicit_index: Option<u32>,
    ) -> IdResult<Identifier> {
        let parent_parts = parent.parse()?;
        let parent_level = parent_parts.kind();
        if !parent_level.accepts_child(level) {
            return Err(IdError::InvalidParent {
                parent: parent_level,
                child: level,
            });
        }

        let ordinal = match explicit_index {
            Some(index) => {
                let token = LevelToken::new(level, index)?;
                self.table.observe_ordinal(parent, level, index);
                token.ordinal
            }
            None => self.table.next_ordinal(parent, level)?,
        };

        let mut tokens = parent_parts.tokens.clone();
        tokens.push(LevelToken { level, ordinal });
        let parsed = ParsedId {
            base: parent_parts.base,
            date: parent_parts.date,
            timestamp_ms: self.clock.now().timestamp_millis().max(0),
            tokens,
        };
        let id = Identifier::from_parts(&parsed);
        self.table.record(&parsed, &id)?;

        let root = self
            .table
            .root_of(parent)
            .cloned()
            .or_else(|| (parent_level == IdLevel::Work).then(|| parent.clone()));
        if let Some(root) = root {
            self.table.roots.insert(id.clone(), root);
        }
        tracing::debug!(id = %id, %level, ordinal, "minted child id");
        Ok(id)
    }

    /// Strict lineage: both identifiers were minted here under the same Work.
    pub fn same_lineage_strict(&self, a: &Identifier, b: &Identifier) -> bool {
        match (self.table.root_of(a), self.table.root_of(b)) {
            (Some(ra), Some(rb)) => ra == rb,
            _ => false,
        }
    }

    fn random_base(&mut self) -> String {
        (0..BASE_LEN)
            .map(|_| ALPHABET[self.rng.gen_range(0..ALPHABET.len())] as char)
            .collect()
    }
}

/// Deterministic base token for a semantic context.
pub(crate) fn semantic_base(title: &str, source_path: &str) -> String {
    let name = format!("{}\u{1f}{}", title, source_path);
    let digest = Uuid::new_v5(&BASE_NAMESPACE, name.as_bytes());
    digest.as_bytes()[..BASE_LEN]
        .iter()
        .map(|b| ALPHABET[*b as usize % ALPHABET.len()] as char)
        .collect()
}
