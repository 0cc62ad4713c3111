pub mod aggregate;
pub mod cli;
pub mod enhance;
pub mod error;
pub mod ext;
pub mod ingest;
pub mod model;
pub mod parse;
pub mod pipeline;
pub mod publish;
pub mod render;
pub mod store;
pub mod util;
pub mod week;
