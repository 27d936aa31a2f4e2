#![forbid(unsafe_code)]

//! Searchable, virtualized combo-box engine.
//!
//! Two widgets, [`ComboBox`] (single-select) and [`MultiComboBox`]
//! (multi-select), compose a fuzzy ranker, a debounced query controller
//! over static or async option sources, a virtual row layout, and an
//! overlay positioner. They consume [`combo_core::event::Event`]s and emit
//! [`view::ComboView`] models; drawing is left to the host.

pub mod combobox;
pub mod config;
pub mod dropdown;
pub mod entries;
pub mod fuzzy;
pub mod multi_combobox;
pub mod navigation;
pub mod option;
pub mod overlay;
pub mod query;
pub mod selection;
pub mod source;
pub mod view;
pub mod virtualized;

pub use combobox::{ComboAction, ComboBox};
pub use config::ComboBoxConfig;
pub use multi_combobox::{MultiAction, MultiComboBox};
pub use option::{OptionValue, SelectOption};
pub use selection::MultiValue;
pub use source::{OptionSource, SourceError};
