//! Title Engine — randomized title generation.
//!
//! Combines a categorized vocabulary, a persistent pool of entity names,
//! and a catalog of styled templates into short, attention-grabbing
//! titles, without any model inference.

pub mod core;
pub mod schema;
