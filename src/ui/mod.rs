//! Browser-facing side of the app, rendered on the server.

pub mod client;
pub mod form;
pub mod render;
pub mod view;
