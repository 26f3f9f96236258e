//! Domain layer: stations, price observations, credentials and search model.
//!
//! Types here carry no I/O. The store, the provider client and the services
//! all exchange these values.

pub mod credential;
pub mod enriched;
pub mod geo;
pub mod price;
pub mod search;
pub mod station;

pub use credential::{Credential, CredentialCell};
pub use enriched::{EnrichedStation, FullStation, SimplifiedStation, StationView};
pub use geo::{GeoPoint, SearchArea};
pub use price::{NewPriceObservation, PriceObservation, PriceTuple};
pub use search::{SearchQuery, SortKey, StationFilter};
pub use station::{Station, StationAddress};
