pub mod order;
pub mod product;
pub mod stats;
pub mod user;
