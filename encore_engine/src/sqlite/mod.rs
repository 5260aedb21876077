//! SQLite database module for the Encore request engine.

mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
