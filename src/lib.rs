pub mod cli;
pub mod config;
pub mod connector;
pub mod error;
pub mod protocol;
pub mod session;
pub mod shape;

#[cfg(test)]
mod testing;

pub use cli::{Command, prompt, render};
pub use config::{Config, Separators};
pub use connector::{Connector, Endpoint, Socket};
pub use error::{Error, LastError, ReservedHeader};
pub use protocol::{QueryResult, Row};
pub use session::Session;
pub use shape::{QueryOptions, RowMap};
