mod error;
mod routes;
mod seed;

pub use error::ApiError;
pub use routes::{router, AppState};
pub use seed::seed_known_users;
