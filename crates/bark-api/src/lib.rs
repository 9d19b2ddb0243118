pub mod auth;
pub mod barks;
pub mod comments;
pub mod error;
pub mod middleware;
pub mod reports;
pub mod suggest;
pub mod users;
pub mod validate;
pub mod views;

#[cfg(test)]
pub(crate) mod testutil;
