pub mod models;
pub mod redirect;
pub mod routes;
pub mod services;

pub use routes::ReaderApi;
