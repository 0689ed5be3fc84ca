pub mod account;
pub mod chapter_data;
pub mod health;
pub mod resolution;
