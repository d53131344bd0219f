pub mod controller;
pub mod registration;
pub mod router;
pub mod service;
