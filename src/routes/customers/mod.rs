pub mod addresses;
pub mod orders;
