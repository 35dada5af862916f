pub mod detail;
pub mod links;
pub mod location;
