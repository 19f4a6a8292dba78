// Job search: facet tables, parameter resolution, the 104 client, and the
// text formatter that turns hits into LLM-ready context.

pub mod client;
pub mod facets;
pub mod format;
pub mod models;
pub mod resolver;
pub mod tool;
