pub mod app_config;
pub mod block;
pub mod content;
pub mod db;
pub mod identity;
pub mod middleware;
pub mod orm;
pub mod web;
