// Cloud API (aseko.cloud): bearer-token auth service plus GraphQL.

pub mod client;
pub(crate) mod graphql;
pub mod models;
pub mod query;

pub use client::CloudAccount;
pub use models::User;
pub use query::UNITS_QUERY;
