pub mod create;
pub mod delete;
pub mod get;
pub mod models;
pub mod patch;
pub mod routes;
pub mod tree;
pub mod vote;
