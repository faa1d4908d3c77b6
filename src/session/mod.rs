pub mod model;
pub mod service;
pub mod store;

pub use model::{Leg, PrankSession, SessionState};
pub use service::SessionService;
pub use store::{PgSessionStore, SessionStore};
