//! Mail exchanger resolution.
//!
//! [`MxResolver`] is the lookup capability; [`DnsMxResolver`] implements it
//! over the system resolver. [`resolve_mx_with_retry`] adds bounded retries
//! and turns failures into verdicts.

mod error;
mod resolver;
mod types;

pub use error::DnsError;
pub use resolver::{DnsMxResolver, MxResolver, resolve_mx_with_retry};
pub use types::MxHost;

#[cfg(test)]
pub(crate) mod tests;
