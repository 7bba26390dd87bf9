//! Source API clients

pub mod nof1;

pub use nof1::{fetch_snapshot, Nof1Client};
