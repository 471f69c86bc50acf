//! HTTP API: configuration, routing, authentication and the data-shape
//! access control layer that sits between the router and the handlers.

pub mod app;
pub mod authz;
pub mod config;
pub mod context;
pub mod data_control;
pub mod middleware;
