pub mod client;
pub mod session;
pub mod types;

pub use client::ApplianceClient;
pub use session::{Scoped, Session, SessionManager};
