pub mod health;
pub mod metrics;
pub mod pgqueue;
pub mod pseudonymize;
pub mod record;
pub mod source;
pub mod transform;
pub mod version;
