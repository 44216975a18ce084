mod cache;
mod client;
mod session;
mod submit;
pub mod utils;
