pub mod chunk;
pub mod classification;
pub mod config;
pub mod message;
pub mod page;
pub mod summary;
