// src/handlers/mod.rs

pub mod auth;
pub mod categories;
pub mod student;
pub mod teacher;
