pub mod models;
pub mod moderation;
pub mod routes;
pub mod subscription;
