pub mod gatt;
pub mod models;
pub mod session;
pub mod settings;
