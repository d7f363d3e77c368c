// aseko-api: Async Rust client for the Aseko pool cloud (legacy REST + GraphQL)

pub mod cloud;
pub mod consumable;
pub mod error;
pub mod legacy;
pub mod session;
pub mod status;
pub mod token;
pub mod transport;
pub mod unit;

pub use cloud::{CloudAccount, User};
pub use consumable::{Consumable, ConsumableType};
pub use error::Error;
pub use legacy::{AccountInfo, LegacyApi, LegacyUnit, MobileAccount, UnitState, WebAccount};
pub use session::{AccountCredentials, Authenticator, SessionManager};
pub use status::{StatusKind, StatusValueType, StatusValues};
pub use token::Credential;
pub use transport::{Endpoints, TransportConfig};
pub use unit::{AnyUnit, Unit, UnitNeverConnected, decode_unit};
