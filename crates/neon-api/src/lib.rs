pub mod convert;
pub mod error;
pub mod realtime;
pub mod routes;
pub mod services;
pub mod state;

pub use error::{ServiceError, ServiceResult};
pub use state::{AppState, AppStateInner};
