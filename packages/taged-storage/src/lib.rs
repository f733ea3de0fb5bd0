pub mod cache;
pub mod client;
pub mod db;
pub mod elasticsearch;
pub mod index;
pub mod models;
pub mod paginator;
pub mod query;
pub mod schema;
pub mod tags;

mod error;

pub use error::Error;

use std::{future::Future, pin::Pin};

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
