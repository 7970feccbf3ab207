mod handlers;
mod helpers;
mod router;
mod types;

pub use handlers::core::open_account;
pub use helpers::bad_json;
pub use router::handle_request;
pub use types::{AppState, Request};
