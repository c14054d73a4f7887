pub mod server;

pub use server::{router, serve, AppState, CreateAmmResponse, ErrorResponse};
