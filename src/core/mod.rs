//! Core domain models and business logic for the service book

pub mod auth;
pub mod config;
pub mod db;
pub mod garage;
pub mod mail;
pub mod register;
pub mod validation;
