//! Mail exchanger resolution.
//!
//! [`MxResolver`] wraps a DNS resolver (the system one by default) and turns
//! the MX record set of a domain into an ordered list of [`MxHost`]s.

mod error;
mod resolver;
mod types;

pub use error::MxError;
pub use resolver::{LookupMx, MxResolver};
pub use types::MxHost;

#[cfg(test)]
mod tests;
