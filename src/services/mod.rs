// Service exports
pub mod geocoder;
pub mod lookup;
pub mod transactions;

pub use geocoder::{GeocodedAddress, Geocoder, GeocoderError, GeoplateformeClient};
pub use lookup::{ComparablesService, Lookup, LookupError};
pub use transactions::{StoreError, SupabaseClient, TransactionStore};
