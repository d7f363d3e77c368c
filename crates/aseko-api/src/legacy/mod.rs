// Legacy REST API (pool.aseko.com)
//
// Two flavours share the same unit endpoints: the web API authenticates
// with a session cookie, the mobile API with an `access-token` header.

pub(crate) mod client;
pub mod mobile;
pub mod models;
pub mod unit;
pub mod web;

pub use mobile::MobileAccount;
pub use models::{AccountInfo, UnitError, UnitSummary};
pub use unit::{LegacyApi, LegacyUnit, UnitState, Variable};
pub use web::WebAccount;
