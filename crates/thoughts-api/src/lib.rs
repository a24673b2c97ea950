pub mod auth;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;
pub mod thoughts;

pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, AppStateInner};
