//! Data models for the tourism API.
//!
//! These mirror the remote JSON schema and are pass-through records:
//!
//! - `Event`, `EventsResponse`: Calendar events and the paginated envelope
//! - `Category`, `Municipality`: Reference data nested inside events and beaches
//! - `Beach`, `DetailedBeach`, `Place`: Beaches and their nearby places
//! - Query types: `EventsQuery`, `FilteredEventsQuery`, `BeachesQuery`
//! - `ExchangeRates`: Currency rates shown on the info screen

pub mod beach;
pub mod currency;
pub mod event;
pub mod language;
pub mod municipality;
pub mod query;

pub use beach::{Beach, DetailedBeach, NearbyPlaceGroup, Place, PlaceCategory};
pub use currency::{CurrencyRate, ExchangeRates};
pub use event::{Category, Event, EventsResponse};
pub use language::Language;
pub use municipality::Municipality;
pub use query::{BeachesQuery, EventsQuery, FilteredEventsQuery, IdQuery};
