// src/models/mod.rs

pub mod assessment;
pub mod course;
pub mod question;
pub mod result;
pub mod user;
