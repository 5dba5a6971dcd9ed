//! Browser-driven oracles for the number lookup page.

mod checknumber;
mod client;
pub(crate) mod page;
mod positional;

pub use checknumber::CheckNumberOracle;
pub use page::{LookupPage, PositionalPage, SelectorPage};
pub use positional::PositionalOracle;
