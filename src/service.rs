pub mod error;
pub mod filters;
pub mod property_service;
