//! Colored link tries: build junction-choice records by threading reads
//! through a finished graph, clean them against a Poisson-derived
//! coverage threshold, and persist them to the gzip text wire format
//! (§4.7, §4.8, §6).

pub mod builder;
pub mod cleaner;
pub mod format;
pub mod store;
pub mod threshold;

pub use builder::thread_read;
pub use cleaner::{clean_links, clean_links_default, LinkCleanStats};
pub use store::{Cursor, LinkStore};
