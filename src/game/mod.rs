pub mod collision;
pub mod constants;
pub mod direction;
pub mod input;
pub mod rng;
pub mod sim;
pub mod types;
