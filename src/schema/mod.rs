pub mod tag;
pub mod template;
