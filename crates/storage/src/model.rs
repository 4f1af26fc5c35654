//! Mutations, predicates and read results

/// A single write to one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Write `value` into `family:column` at `timestamp` (microseconds)
    Set {
        /// Column family
        family: String,
        /// Column qualifier
        column: String,
        /// Cell timestamp in microseconds; the latest timestamp wins on read
        timestamp: i64,
        /// Cell value
        value: Vec<u8>,
    },
    /// Remove every version of `family:column`
    DeleteColumn {
        /// Column family
        family: String,
        /// Column qualifier
        column: String,
    },
}

impl Mutation {
    /// Shorthand for [`Mutation::Set`]
    pub fn set(family: &str, column: &str, timestamp: i64, value: Vec<u8>) -> Self {
        Mutation::Set {
            family: family.to_string(),
            column: column.to_string(),
            timestamp,
            value,
        }
    }

    /// Family the mutation touches
    pub fn family(&self) -> &str {
        match self {
            Mutation::Set { family, .. } | Mutation::DeleteColumn { family, .. } => family,
        }
    }
}

/// Condition evaluated atomically against the current state of a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Latest value of `family:column` equals `value`
    ColumnEquals {
        /// Column family
        family: String,
        /// Column qualifier
        column: String,
        /// Expected value
        value: Vec<u8>,
    },
    /// `family:column` has any value
    ColumnExists {
        /// Column family
        family: String,
        /// Column qualifier
        column: String,
    },
}

/// Row-scoped compare-and-mutate
///
/// The predicate is evaluated and the matching branch applied as one atomic
/// step with respect to every other write to the same row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CondMutation {
    /// Condition to evaluate
    pub predicate: Predicate,
    /// Applied when the predicate holds
    pub on_match: Vec<Mutation>,
    /// Applied when the predicate does not hold
    pub on_no_match: Vec<Mutation>,
}

impl CondMutation {
    /// Apply `mutations` only if the predicate holds
    pub fn if_match(predicate: Predicate, mutations: Vec<Mutation>) -> Self {
        Self {
            predicate,
            on_match: mutations,
            on_no_match: Vec::new(),
        }
    }

    /// Apply `mutations` only if the predicate does not hold
    pub fn if_no_match(predicate: Predicate, mutations: Vec<Mutation>) -> Self {
        Self {
            predicate,
            on_match: Vec::new(),
            on_no_match: mutations,
        }
    }
}

/// Latest version of one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Column family
    pub family: String,
    /// Column qualifier
    pub column: String,
    /// Cell timestamp in microseconds
    pub timestamp: i64,
    /// Cell value
    pub value: Vec<u8>,
}

/// A row as returned by a read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Row key
    pub key: String,
    /// Cells sorted by family, then column
    pub cells: Vec<Cell>,
}

impl Row {
    /// Latest cell of `family:column`
    pub fn cell(&self, family: &str, column: &str) -> Option<&Cell> {
        self.cells
            .iter()
            .find(|c| c.family == family && c.column == column)
    }

    /// Cells of one family
    pub fn family<'a>(&'a self, family: &'a str) -> impl Iterator<Item = &'a Cell> + 'a {
        self.cells.iter().filter(move |c| c.family == family)
    }
}
