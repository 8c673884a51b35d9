pub mod coingecko;
pub mod util;
pub mod version;
