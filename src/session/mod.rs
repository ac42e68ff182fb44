pub mod api;
pub mod dto;
#[cfg(test)]
pub mod fake;
pub mod flight_session;
pub mod urls;

pub use api::FlightApi;
pub use flight_session::FlightSession;
pub use urls::*;
