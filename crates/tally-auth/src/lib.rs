pub mod auth;
pub mod principal;

pub use principal::{Principal, RoleLabel};
