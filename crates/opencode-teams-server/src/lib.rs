//! The coordinator crate: the outward command surface (spec §4.6) and the
//! line-delimited JSON protocol it binds to (spec §6.1). The binary in
//! `main.rs` is a thin stdio loop over [`coordinator::Coordinator`].

pub mod coordinator;
pub mod protocol;
pub mod session;

pub use coordinator::Coordinator;
pub use protocol::{Request, Response};
pub use session::Session;
