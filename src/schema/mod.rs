pub mod entity_pool;
pub mod rules;
pub mod style;
pub mod vocabulary;
pub mod warning;
