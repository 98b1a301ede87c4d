mod handlers;
mod routes;
mod state;

pub use handlers::{MovieResponse, SessionResponse};
pub use routes::create_router;
pub use state::{AppState, SessionHandle};
