pub mod rest;
pub mod state;

// Re-export the router builder to make it easily accessible
// to the binary that will build the web server.
pub use rest::{api_router, ApiDoc};
pub use state::AppState;
