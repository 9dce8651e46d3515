pub mod guard;
pub mod password;
pub mod policy;
pub mod token;
