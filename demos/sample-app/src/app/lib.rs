pub mod aspects;
pub mod billing;
pub mod store;
pub mod trace;
