pub mod engine;
pub mod generator;
pub mod grammar;
pub mod names;
pub mod options;
pub mod resolver;
pub mod store;
pub mod theme;
