mod database {
    pub mod actions;
    pub mod connection;
    pub mod error;
    pub mod form;
    pub mod pagination;
    pub mod schema;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod utility {
    pub mod shopping_list;
    pub mod short_link;
}
pub mod config;
mod constants;
pub mod media;
pub mod requests;
pub mod web;

pub use authentication::*;
pub use constants::*;
pub use database::*;
pub use utility::*;
