//! The operation taxonomy produced by the differ (spec §4.2): each carries
//! its kind, the table or constraint it targets, forward SQL, optional
//! rollback SQL, and — for changes the differ refuses to infer — a reason
//! for human review.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OperationKind {
    CreateExtension,
    CreateTable,
    AddColumn,
    AlterColumn,
    AddForeignKey,
    AddIndex,
    CreateHypertable,
    DropHypertable,
    DropIndex,
    DropForeignKey,
    DropColumn,
    DropTable,
    DropExtension,
}

impl OperationKind {
    /// Position in the forward ordering policy from spec §4.2. Drops use the
    /// reverse of this, computed by [`Operation::ordering_key`].
    fn forward_rank(self) -> u8 {
        match self {
            OperationKind::CreateExtension => 0,
            OperationKind::CreateTable => 1,
            OperationKind::AddColumn => 2,
            OperationKind::AlterColumn => 3,
            OperationKind::AddForeignKey => 4,
            OperationKind::AddIndex => 5,
            OperationKind::CreateHypertable => 6,
            OperationKind::DropHypertable => 7,
            OperationKind::DropIndex => 8,
            OperationKind::DropForeignKey => 9,
            OperationKind::DropColumn => 10,
            OperationKind::DropTable => 11,
            OperationKind::DropExtension => 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub kind: OperationKind,
    /// The table name, or `table.constraint` for constraint-scoped kinds.
    pub target: String,
    pub sql: String,
    pub rollback_sql: Option<String>,
    /// Set when the forward SQL can't preserve data (an incompatible type
    /// change becomes add-then-drop) and a human should look at it.
    pub reason: Option<String>,
}

impl Operation {
    pub fn new(kind: OperationKind, target: impl Into<String>, sql: impl Into<String>) -> Self {
        Operation {
            kind,
            target: target.into(),
            sql: sql.into(),
            rollback_sql: None,
            reason: None,
        }
    }

    pub fn with_rollback(mut self, rollback_sql: impl Into<String>) -> Self {
        self.rollback_sql = Some(rollback_sql.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// `(rank, target)` — the tie-break spec §4.2 calls for: ordered by
    /// operation kind, lexical by target within a kind.
    fn ordering_key(&self) -> (u8, &str) {
        (self.kind.forward_rank(), self.target.as_str())
    }
}

/// Stable-sort a flat operation batch into the spec §4.2 ordering: the
/// thirteen kinds in forward-declaration order, lexical by target within
/// each kind.
pub fn order_operations(mut ops: Vec<Operation>) -> Vec<Operation> {
    ops.sort_by(|a, b| a.ordering_key().cmp(&b.ordering_key()));
    ops
}
