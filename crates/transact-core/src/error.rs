use std::fmt;

use thiserror::Error;

/// Core-level errors
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Stage of a transaction invocation that produced a [`Failure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Open,
    Work,
    Panic,
    Rollback,
    Commit,
}

impl FailureKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Work => "work",
            Self::Panic => "panic",
            Self::Rollback => "rollback",
            Self::Commit => "commit",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One component of a [`TxError`].
///
/// The display already renders the wrapped error's full context chain, so the
/// wrapped error is not exposed again as `source()`; use [`Failure::inner`].
#[derive(Error, Debug)]
pub enum Failure {
    /// The transaction source could not open a transaction.
    #[error("begin transaction: {0:#}")]
    Open(anyhow::Error),

    /// The unit of work returned an error.
    #[error("{0:#}")]
    Work(anyhow::Error),

    /// The unit of work panicked; the payload has been converted to an error.
    #[error("{0:#}")]
    Panic(anyhow::Error),

    #[error("rollback: {0:#}")]
    Rollback(anyhow::Error),

    #[error("commit: {0:#}")]
    Commit(anyhow::Error),
}

impl Failure {
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Open(_) => FailureKind::Open,
            Self::Work(_) => FailureKind::Work,
            Self::Panic(_) => FailureKind::Panic,
            Self::Rollback(_) => FailureKind::Rollback,
            Self::Commit(_) => FailureKind::Commit,
        }
    }

    /// ## Summary
    /// Returns the underlying error, e.g. for downcasting to a driver error.
    #[must_use]
    pub const fn inner(&self) -> &anyhow::Error {
        match self {
            Self::Open(err)
            | Self::Work(err)
            | Self::Panic(err)
            | Self::Rollback(err)
            | Self::Commit(err) => err,
        }
    }

    #[must_use]
    pub fn into_inner(self) -> anyhow::Error {
        match self {
            Self::Open(err)
            | Self::Work(err)
            | Self::Panic(err)
            | Self::Rollback(err)
            | Self::Commit(err) => err,
        }
    }
}

/// Composite error returned by a transaction invocation.
///
/// Always holds at least one [`Failure`], in the order they occurred. The
/// textual form lists every component on its own line.
#[derive(Debug)]
pub struct TxError {
    failures: Vec<Failure>,
}

impl TxError {
    /// ## Summary
    /// Joins the present components into a composite.
    ///
    /// ## Errors
    /// Returns a `TxError` holding every `Some` component. Returns `Ok(())` when
    /// every component is `None`.
    pub fn join<I>(components: I) -> Result<(), Self>
    where
        I: IntoIterator<Item = Option<Failure>>,
    {
        let failures: Vec<Failure> = components.into_iter().flatten().collect();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Self { failures })
        }
    }

    /// ## Summary
    /// Joins two outcomes, keeping the components of `first` ahead of `second`.
    ///
    /// ## Errors
    /// Returns a `TxError` if either outcome is an error.
    pub fn merge(first: Result<(), Self>, second: Result<(), Self>) -> Result<(), Self> {
        match (first, second) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(err), Ok(())) | (Ok(()), Err(err)) => Err(err),
            (Err(mut first), Err(second)) => {
                first.failures.extend(second.failures);
                Err(first)
            }
        }
    }

    #[must_use]
    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    #[must_use]
    pub fn into_failures(self) -> Vec<Failure> {
        self.failures
    }

    #[must_use]
    pub fn find(&self, kind: FailureKind) -> Option<&Failure> {
        self.failures.iter().find(|failure| failure.kind() == kind)
    }

    #[must_use]
    pub fn contains(&self, kind: FailureKind) -> bool {
        self.find(kind).is_some()
    }

    /// ## Summary
    /// Returns the failure that caused the invocation to fail, ignoring any
    /// rollback failure joined to it.
    #[must_use]
    pub fn cause(&self) -> &Failure {
        // Never empty: `join` only builds a TxError from at least one failure.
        &self.failures[0]
    }
}

impl From<Failure> for TxError {
    fn from(failure: Failure) -> Self {
        Self {
            failures: vec![failure],
        }
    }
}

impl fmt::Display for TxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

/// Every component is part of the display, so there is no separate source.
impl std::error::Error for TxError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_of_nothing_is_ok() {
        assert!(TxError::join([None, None]).is_ok());
        assert!(TxError::join(std::iter::empty()).is_ok());
    }

    #[test]
    fn test_join_drops_absent_components() {
        let err = TxError::join([
            None,
            Some(Failure::Work(anyhow::anyhow!("banana"))),
            None,
        ])
        .unwrap_err();

        assert_eq!(err.failures().len(), 1);
        assert_eq!(err.cause().kind(), FailureKind::Work);
        assert_eq!(err.to_string(), "banana");
    }

    #[test]
    fn test_every_component_is_discoverable() {
        let err = TxError::join([
            Some(Failure::Work(anyhow::anyhow!("banana"))),
            Some(Failure::Rollback(anyhow::anyhow!("lemon"))),
        ])
        .unwrap_err();

        let text = err.to_string();
        assert!(text.contains("banana"), "{text}");
        assert!(text.contains("lemon"), "{text}");
        assert_eq!(text, "banana\nrollback: lemon");

        assert!(err.contains(FailureKind::Work));
        assert!(err.contains(FailureKind::Rollback));
        assert!(!err.contains(FailureKind::Commit));
        assert_eq!(
            err.find(FailureKind::Rollback).map(|f| f.inner().to_string()),
            Some("lemon".to_string())
        );
    }

    #[test]
    fn test_chain_rendering_prints_each_message_once() {
        let err = TxError::join([
            Some(Failure::Work(anyhow::anyhow!("banana"))),
            Some(Failure::Rollback(anyhow::anyhow!("lemon"))),
        ])
        .unwrap_err();

        assert!(std::error::Error::source(&err).is_none());
        let rendered = format!("{:#}", anyhow::Error::from(err));
        assert_eq!(rendered, "banana\nrollback: lemon");
    }

    #[test]
    fn test_failure_has_no_duplicate_source() {
        let failure = Failure::Commit(anyhow::anyhow!("connection reset"));
        assert!(std::error::Error::source(&failure).is_none());
        assert_eq!(failure.inner().to_string(), "connection reset");
    }

    #[test]
    fn test_context_chain_is_rendered() {
        let inner = anyhow::anyhow!("timeout").context("insert row");
        let failure = Failure::Open(inner);
        assert_eq!(failure.to_string(), "begin transaction: insert row: timeout");
    }

    #[test]
    fn test_merge_keeps_order() {
        let first = TxError::join([Some(Failure::Panic(anyhow::anyhow!("banana")))]);
        let second = TxError::join([Some(Failure::Rollback(anyhow::anyhow!("lemon")))]);
        let merged = TxError::merge(first, second).unwrap_err();

        let kinds: Vec<_> = merged.failures().iter().map(Failure::kind).collect();
        assert_eq!(kinds, vec![FailureKind::Panic, FailureKind::Rollback]);
    }

    #[test]
    fn test_merge_of_two_oks_is_ok() {
        assert!(TxError::merge(Ok(()), Ok(())).is_ok());
    }

    #[test]
    fn test_composite_converts_to_anyhow() {
        let err = TxError::join([Some(Failure::Work(anyhow::anyhow!("banana")))]).unwrap_err();
        let err = anyhow::Error::from(err);
        assert!(err.downcast_ref::<TxError>().is_some());
    }
}
