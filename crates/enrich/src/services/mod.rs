//! External service clients.

pub mod klaviyo;
