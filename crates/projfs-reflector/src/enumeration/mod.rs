//! Directory enumeration sessions.

mod session;
mod table;

pub use session::EnumerationSession;
pub use table::{EnumerationBatch, EnumerationSessionTable, SessionId};
