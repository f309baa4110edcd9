//! Client side of the site API: the REST transport, the shared query cache,
//! and a [`Session`] that runs guarded, notifying mutations on top of both.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod notify;
pub mod rest;
pub mod session;

#[cfg(test)]
mod fake;

pub use api::SiteApi;
pub use cache::{CacheEvent, QueryCache, QueryKey};
pub use config::{ClientConfig, ConfigError, ConfigOverrides};
pub use error::{ApiError, MutationError};
pub use notify::{
    ChannelConfirmer, ChannelNotifier, ConfirmRequest, Confirmer, FixedConfirmer, Notice,
    Notifier, Severity, TracingNotifier,
};
pub use rest::RestClient;
pub use session::{BulkOutcome, EntityKey, InFlightGuard, MoveOutcome, Session};
