//! Import pipeline services.

pub mod csv_parser;
pub mod import_service;
pub mod staging;
