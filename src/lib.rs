pub mod aggregate;
pub mod config;
pub mod error;
pub mod html;
pub mod loader;
pub mod metrics;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod privacy;
pub mod schema;
pub mod types;
pub mod util;
