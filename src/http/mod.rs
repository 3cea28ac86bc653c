pub mod connection;
pub mod expect;
pub mod request;

// Re-export commonly used types for convenient access
pub use connection::{DEFAULT_HTTP_TIMEOUT, HttpConnection};
pub use expect::HttpExpect;
pub use request::HttpRequest;
