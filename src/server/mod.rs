mod handlers;
mod response;

pub mod anomaly;
pub mod audit;
pub mod authn;
pub mod authz;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod factory;
pub mod lookup;
pub mod pipeline;
pub mod restful;
