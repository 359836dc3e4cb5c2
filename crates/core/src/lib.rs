//! Domain types and pure logic for the rowdesk assignment rule engine.
//!
//! Nothing in this crate performs I/O. The async orchestration lives in
//! `rowdesk-engine`; persistence lives in `rowdesk-db`.

pub mod assignment;
pub mod error;
pub mod types;
