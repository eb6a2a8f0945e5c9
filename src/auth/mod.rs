pub mod identity;
pub mod middleware;
pub mod provider;
pub mod session;
pub mod validate;

pub use identity::{Credentials, Identity, IdentityResolver};
