pub mod cookies;
pub mod dedupe;
pub mod filesets;
pub mod models;
