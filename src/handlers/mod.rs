// src/handlers/mod.rs

pub mod questions;
pub mod quiz;
pub mod subjects;
pub mod users;
