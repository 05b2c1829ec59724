//! Transaction options passed through to the transaction source when a
//! transaction is opened.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    Serializable,
    RepeatableRead,
    ReadCommitted,
    ReadUncommitted,
}

impl IsolationLevel {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Serializable => "SERIALIZABLE",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::ReadCommitted => "READ COMMITTED",
            Self::ReadUncommitted => "READ UNCOMMITTED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    ReadWrite,
    ReadOnly,
}

impl AccessMode {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::ReadWrite => "READ WRITE",
            Self::ReadOnly => "READ ONLY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeferrableMode {
    Deferrable,
    NotDeferrable,
}

impl DeferrableMode {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Deferrable => "DEFERRABLE",
            Self::NotDeferrable => "NOT DEFERRABLE",
        }
    }
}

/// Isolation level and access mode requested when a transaction is opened.
///
/// Unset fields fall back to the server defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
pub struct TxOptions {
    #[serde(default)]
    pub isolation_level: Option<IsolationLevel>,
    #[serde(default)]
    pub access_mode: Option<AccessMode>,
    #[serde(default)]
    pub deferrable_mode: Option<DeferrableMode>,
}

impl TxOptions {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            isolation_level: None,
            access_mode: None,
            deferrable_mode: None,
        }
    }

    #[must_use]
    pub const fn with_isolation_level(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = Some(level);
        self
    }

    #[must_use]
    pub const fn with_access_mode(mut self, mode: AccessMode) -> Self {
        self.access_mode = Some(mode);
        self
    }

    #[must_use]
    pub const fn with_deferrable_mode(mut self, mode: DeferrableMode) -> Self {
        self.deferrable_mode = Some(mode);
        self
    }

    #[must_use]
    pub const fn serializable(self) -> Self {
        self.with_isolation_level(IsolationLevel::Serializable)
    }

    #[must_use]
    pub const fn repeatable_read(self) -> Self {
        self.with_isolation_level(IsolationLevel::RepeatableRead)
    }

    #[must_use]
    pub const fn read_committed(self) -> Self {
        self.with_isolation_level(IsolationLevel::ReadCommitted)
    }

    #[must_use]
    pub const fn read_only(self) -> Self {
        self.with_access_mode(AccessMode::ReadOnly)
    }

    #[must_use]
    pub const fn read_write(self) -> Self {
        self.with_access_mode(AccessMode::ReadWrite)
    }

    #[must_use]
    pub const fn deferrable(self) -> Self {
        self.with_deferrable_mode(DeferrableMode::Deferrable)
    }

    /// ## Summary
    /// Renders the `BEGIN` statement that opens a transaction with these options.
    ///
    /// Clauses appear in the order isolation level, access mode, deferrable mode;
    /// default options render a bare `BEGIN`.
    #[must_use]
    pub fn begin_sql(&self) -> String {
        let mut sql = String::from("BEGIN");
        if let Some(level) = self.isolation_level {
            sql.push_str(" ISOLATION LEVEL ");
            sql.push_str(level.as_sql());
        }
        if let Some(mode) = self.access_mode {
            sql.push(' ');
            sql.push_str(mode.as_sql());
        }
        if let Some(mode) = self.deferrable_mode {
            sql.push(' ');
            sql.push_str(mode.as_sql());
        }
        sql
    }
}
