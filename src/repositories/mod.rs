// src/repositories/mod.rs

pub mod questions;
pub mod results;

pub use questions::{QuestionStore, SqliteQuestionStore};
pub use results::{ResultStore, SqliteResultStore};
