mod user;

pub use user::{UserPatch, UserRecord};
