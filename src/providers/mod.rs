pub mod caching;
pub mod exchange_rates;
pub mod util;

pub use caching::{RateProvider, RateProviderOptions, RefreshOutcome};
pub use exchange_rates::HttpRateSource;
