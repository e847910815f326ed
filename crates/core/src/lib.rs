#![deny(warnings)]

pub mod clean;
pub mod config;
pub mod credentials;
pub mod enrich;
pub mod fanout;
pub mod lang;
pub mod translate;
