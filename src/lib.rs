#![doc = "The `task_manager` library crate."]
#![doc = ""]
#![doc = "Configuration, the request-scoped database session layer, authentication,"]
#![doc = "domain models, route groups and error handling for the Task Manager API."]
#![doc = "The binary (`main.rs`) loads settings and hands them to [`app::launch`]."]

pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
