pub mod legacy;
pub mod status;

pub use legacy::LegacyHttpApp;
pub use status::StatusHttpApp;
