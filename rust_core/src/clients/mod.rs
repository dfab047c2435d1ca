pub mod sheet;
pub mod skinport;
pub mod steam;

// Re-export commonly used types
pub use sheet::SheetCsvClient;
pub use skinport::SkinportClient;
pub use steam::{DirectQuoteClient, SteamMarketClient};
