// src/handlers/mod.rs

pub mod assessments;
pub mod auth;
pub mod courses;
pub mod results;
pub mod users;
