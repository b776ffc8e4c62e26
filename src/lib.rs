pub use client::{extract_match, FbrefClient};
pub use driver::{load_fixtures, run, DriverOptions, Fixture, RunReport};
pub use error::{FbrefError, Result};
pub use session::{Session, SessionOptions};

pub mod client;
pub mod driver;
pub mod error;
pub(crate) mod fbref;
pub mod model;
pub mod session;
