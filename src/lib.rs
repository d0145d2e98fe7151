pub mod config;
pub mod fetch;
pub mod history;
pub mod pipeline;
pub mod process;
pub mod publish;
pub mod schema;
pub mod transforms;
pub mod validate;
