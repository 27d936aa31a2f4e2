#![forbid(unsafe_code)]

//! Option sources.
//!
//! A source is either a concrete list or an async lookup keyed by the query
//! text. A source is async iff it is a function; the query controller picks
//! its filtering path from that alone.

use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::LocalBoxFuture;

use crate::option::{OptionValue, SelectOption};

/// Future returned by an async option source.
pub type LoadFuture<V> = LocalBoxFuture<'static, Result<Vec<SelectOption<V>>, SourceError>>;

/// Async lookup: query text in, options out.
pub type Loader<V> = Rc<dyn Fn(&str) -> LoadFuture<V>>;

/// Where a combo box gets its options from.
pub enum OptionSource<V> {
    /// A fixed list, filtered locally by the fuzzy ranker.
    Static(Vec<SelectOption<V>>),
    /// A lookup function that does its own filtering.
    Async(Loader<V>),
}

impl<V: OptionValue> OptionSource<V> {
    /// Wrap an async function as a source.
    ///
    /// The function receives an owned copy of the query so the returned
    /// future can outlive the call.
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(String) -> Fut + 'static,
        Fut: Future<Output = Result<Vec<SelectOption<V>>, SourceError>> + 'static,
    {
        Self::Async(Rc::new(move |query: &str| f(query.to_owned()).boxed_local()))
    }

    /// Whether options come from an async lookup.
    #[inline]
    pub fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }
}

impl<V> Clone for OptionSource<V>
where
    V: Clone,
{
    fn clone(&self) -> Self {
        match self {
            Self::Static(options) => Self::Static(options.clone()),
            Self::Async(loader) => Self::Async(Rc::clone(loader)),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for OptionSource<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(options) => f.debug_tuple("Static").field(&options.len()).finish(),
            Self::Async(_) => f.write_str("Async(..)"),
        }
    }
}

impl<V> From<Vec<SelectOption<V>>> for OptionSource<V> {
    fn from(options: Vec<SelectOption<V>>) -> Self {
        Self::Static(options)
    }
}

/// Failure reported by an async option source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The lookup failed with a message (network error, bad response, ...).
    Message(String),
    /// The lookup was abandoned before producing a result.
    Cancelled,
}

impl SourceError {
    /// Build an error from anything printable.
    pub fn msg(message: impl fmt::Display) -> Self {
        Self::Message(message.to_string())
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(message) => write!(f, "option source failed: {message}"),
            Self::Cancelled => write!(f, "option source cancelled"),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<futures::channel::oneshot::Canceled> for SourceError {
    fn from(_: futures::channel::oneshot::Canceled) -> Self {
        Self::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn static_source_is_not_async() {
        let source: OptionSource<String> =
            vec![SelectOption::labeled("A", "a".to_string())].into();
        assert!(!source.is_async());
        assert_eq!(format!("{source:?}"), "Static(1)");
    }

    #[test]
    fn fn_source_receives_query() {
        let source = OptionSource::from_fn(|query: String| async move {
            Ok(vec![SelectOption::labeled(query.clone(), query)])
        });
        assert!(source.is_async());
        let OptionSource::Async(loader) = source else {
            panic!("expected async source");
        };
        let options = block_on(loader("hello")).expect("loads");
        assert_eq!(options[0].value, "hello");
    }

    #[test]
    fn error_display() {
        assert_eq!(
            SourceError::msg("503").to_string(),
            "option source failed: 503"
        );
        assert_eq!(SourceError::Cancelled.to_string(), "option source cancelled");
    }

    #[test]
    fn canceled_channel_maps_to_cancelled() {
        let (tx, rx) = futures::channel::oneshot::channel::<u8>();
        drop(tx);
        let err: SourceError = block_on(rx).unwrap_err().into();
        assert_eq!(err, SourceError::Cancelled);
    }
}
