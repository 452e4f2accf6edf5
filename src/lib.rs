//! # Ocean Data Query Library
//!
//! ARGO float data in PostgreSQL: a CSV loader that replaces a table with an
//! inferred schema, and a query service whose operations all answer with a
//! uniform [`envelope::Envelope`].
//!
//! ```no_run
//! use ocean_data_query::{config::Config, service::OceanDataQuery};
//!
//! # async fn demo() -> Result<(), ocean_data_query::error::QueryError> {
//! let config = Config::default();
//! let service = OceanDataQuery::connect(&config).await?;
//! let envelope = service
//!     .query_by_location((-10.0, 10.0), (60.0, 80.0), 5)
//!     .await;
//! println!("{}", envelope.message);
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod db;
pub mod envelope;
pub mod error;
pub mod loader;
pub mod logging;
pub mod output;
pub mod record;
pub mod service;
pub mod sql;
pub mod validate;
