//! Email/password authentication service for the dashboard
//! Register, login, session check and logout over a Postgres `users` table

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;
pub mod telemetry;
