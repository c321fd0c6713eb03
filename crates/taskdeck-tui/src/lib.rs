pub mod app;
pub mod components;
pub mod context;
pub mod views;
