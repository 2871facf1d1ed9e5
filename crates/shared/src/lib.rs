pub mod base;
pub mod compose;
pub mod controller;
pub mod models;
pub mod store;
pub mod sync;
