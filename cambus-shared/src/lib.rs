pub mod models;
pub mod pii;

/// Currency every fare and parcel price is quoted in.
pub const CURRENCY: &str = "XAF";
