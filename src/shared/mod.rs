pub mod names;
pub mod validate;
