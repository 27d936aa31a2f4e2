#![forbid(unsafe_code)]

//! Core: geometry and canonical input events shared by the combo-box widgets.

pub mod event;
pub mod geometry;
