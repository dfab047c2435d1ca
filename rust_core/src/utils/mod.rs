pub mod normalize;
pub mod price_parse;

pub use normalize::normalize_name;
pub use price_parse::parse_price_str;
