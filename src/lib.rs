pub mod app;
pub mod config;
pub mod game;
pub mod lobby;
pub mod net;
pub mod persist;
pub mod protocol;
pub mod render;
pub mod shared;
pub mod tty;
