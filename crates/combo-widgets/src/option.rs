#![forbid(unsafe_code)]

//! Option model.
//!
//! A [`SelectOption`] is one row of data offered by a combo box. Its `value`
//! is the identity key: two options are equal iff their values are equal,
//! whatever their labels say.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Description attached to the synthetic option built from the query text.
pub const CUSTOM_VALUE_DESCRIPTION: &str = "Use custom value";

/// A value type usable as an option identity.
///
/// Implemented for `String` and the primitive integer types. The
/// `Display` form is used as the label fallback and for row identifiers.
pub trait OptionValue: Clone + Eq + Hash + fmt::Debug + fmt::Display + 'static {
    /// Build a value from free text typed by the user.
    ///
    /// Returning `None` means the query cannot become a value of this type,
    /// and no custom-value row is offered.
    fn from_custom(query: &str) -> Option<Self> {
        let _ = query;
        None
    }

    /// Whether the `Display` form equals `text`, without allocating.
    fn display_eq(&self, text: &str) -> bool {
        let mut cmp = DisplayCmp { rest: text };
        fmt::write(&mut cmp, format_args!("{self}")).is_ok() && cmp.rest.is_empty()
    }
}

/// Consumes the expected text as formatted pieces arrive; errors on the
/// first mismatch.
struct DisplayCmp<'a> {
    rest: &'a str,
}

impl fmt::Write for DisplayCmp<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        match self.rest.strip_prefix(s) {
            Some(rest) => {
                self.rest = rest;
                Ok(())
            }
            None => Err(fmt::Error),
        }
    }
}

impl OptionValue for String {
    fn from_custom(query: &str) -> Option<Self> {
        Some(query.to_owned())
    }

    fn display_eq(&self, text: &str) -> bool {
        self == text
    }
}

macro_rules! impl_option_value_int {
    ($($ty:ty),*) => {
        $(
            impl OptionValue for $ty {
                fn from_custom(query: &str) -> Option<Self> {
                    query.trim().parse().ok()
                }
            }
        )*
    };
}

impl_option_value_int!(i32, i64, u32, u64, usize);

/// One selectable (or informational) row of data.
#[derive(Debug, Clone)]
pub struct SelectOption<V> {
    /// Display text. Falls back to the value's `Display` form when absent.
    pub label: Option<String>,
    /// Identity key, unique within an option set.
    pub value: V,
    /// Secondary line rendered under the label.
    pub description: Option<String>,
    /// Group name. Options of one group must be contiguous in the input.
    pub group: Option<String>,
    /// Rendered but never selectable (inline help rows).
    pub info_only: bool,
}

impl<V: OptionValue> SelectOption<V> {
    /// Create an unlabeled option.
    pub fn new(value: V) -> Self {
        Self {
            label: None,
            value,
            description: None,
            group: None,
            info_only: false,
        }
    }

    /// Create an option with a label.
    pub fn labeled(label: impl Into<String>, value: V) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::new(value)
        }
    }

    /// Set description (builder).
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set group (builder).
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Mark the option as informational only (builder).
    pub fn info_only(mut self) -> Self {
        self.info_only = true;
        self
    }

    /// The synthetic option offered when the user types a value absent
    /// from the source.
    pub fn custom(query: &str) -> Option<Self> {
        V::from_custom(query).map(|value| {
            Self::labeled(query, value).with_description(CUSTOM_VALUE_DESCRIPTION)
        })
    }

    /// Label shown to the user, falling back to the value's string form.
    pub fn display_label(&self) -> Cow<'_, str> {
        match &self.label {
            Some(label) => Cow::Borrowed(label.as_str()),
            None => Cow::Owned(self.value.to_string()),
        }
    }

    /// Whether the option can be confirmed.
    #[inline]
    pub fn is_selectable(&self) -> bool {
        !self.info_only
    }

    /// Whether the option renders a description block.
    #[inline]
    pub fn has_description(&self) -> bool {
        self.description.as_deref().is_some_and(|d| !d.is_empty())
    }
}

impl<V: PartialEq> PartialEq for SelectOption<V> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<V: Eq> Eq for SelectOption<V> {}

impl<V: Hash> Hash for SelectOption<V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<V: OptionValue> From<V> for SelectOption<V> {
    fn from(value: V) -> Self {
        Self::new(value)
    }
}

/// Build string options from `(label, value)` pairs.
pub fn string_options<'a>(
    pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Vec<SelectOption<String>> {
    pairs
        .into_iter()
        .map(|(label, value)| SelectOption::labeled(label, value.to_owned()))
        .collect()
}
