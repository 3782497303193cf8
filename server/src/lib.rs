//! Classroom Server
//!
//! Online classroom backend: password and Google sign-in, stateless session
//! tokens, and role-gated class participation for educators and students.

pub mod api;
pub mod auth;
pub mod classes;
pub mod config;
pub mod db;
pub mod permissions;
