//! # tte
//!
//! A minimal modal-less terminal text editor: a single buffer with a
//! line-number gutter, scrolling or soft-wrap rendering, incremental search
//! and file save with overwrite confirmation.

pub use crate::{config::Config, editor::Editor, error::Error};

pub mod ansi_escape;
mod config;
pub mod dlog;
mod editor;
mod error;
mod row;
mod terminal;

#[cfg(unix)] mod unix;
#[cfg(unix)] use unix as sys;
