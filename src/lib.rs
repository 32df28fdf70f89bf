//! GM Oracle — tag taxonomy and procedural text generation for tabletop
//! role-playing sessions.
//!
//! Content is declared as a graph of tags (categories and phrase fragments)
//! linked by inheritance, requirements, exclusions and exclusivity groups.
//! The engine picks random, mutually consistent fragments from that graph,
//! expands `#{category}` references inside them, and repairs the French
//! grammar of the stitched result.

pub mod core;
pub mod schema;
