pub mod error;
pub mod inventory;
pub mod parse;
pub mod runner;
pub mod scheduler;
pub mod search;
pub mod server;
pub mod source;
