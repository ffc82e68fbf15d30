pub mod error;
pub mod gateway;
pub mod history_cache;

pub use error::FetchError;
pub use gateway::{HttpGateway, PredictionApi};
pub use history_cache::TeamHistoryCache;
