pub mod connection;
pub mod credential;
pub mod destroy;
pub mod driver;
pub mod region;
pub mod resource;
pub mod tag;
