pub mod auth;
pub mod protocol;
pub mod server;

pub use server::{AppState, app, run};
