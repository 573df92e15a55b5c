//! ticketforge-core library.
//!
//! Pipeline: a [`source::TabularSource`] yields task rows, [`aggregate`]
//! totals them per process, [`hierarchy::build`] shapes them into a ticket
//! tree, [`document`] and [`render`] persist and preview that tree, and
//! [`submit::Submitter`] creates it on an issue tracker.
//!
//! # Conventions
//!
//! - **Errors**: library operations return [`error::TicketError`]; configuration
//!   loading uses `anyhow::Result`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod aggregate;
pub mod config;
pub mod document;
pub mod error;
pub mod hierarchy;
pub mod model;
pub mod render;
pub mod retry;
pub mod sanitize;
pub mod source;
pub mod submit;
pub mod walk;

pub use error::{ApiError, ErrorCode, TicketError, ValidationError};
