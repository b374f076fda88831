pub mod domain;
pub mod error;
pub mod networks;
pub mod protocol;
