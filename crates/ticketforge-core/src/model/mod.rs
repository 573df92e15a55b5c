//! Estimate and ticket data model.

mod estimate;
mod ticket;

pub use estimate::{ParseProcessError, ProcessType, ProjectData, RowRejection, TaskEstimate};
pub use ticket::{CreatedTicket, NodeKind, TicketNode};
