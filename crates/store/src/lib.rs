pub mod client;
pub mod error;
pub mod event;
pub mod models;

pub use client::{Filter, Page, StoreClient};
pub use error::{EventError, StoreError};
pub use event::{ChangeEvent, RawEnvelope, TableEvent};
