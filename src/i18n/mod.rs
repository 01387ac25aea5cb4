//! Locale handling.
//!
//! - `locale`: validated `Locale` codes
//! - `registry`: the ordered set of locales that must have search documents

mod locale;
mod registry;

pub use locale::Locale;
pub use registry::LocaleRegistry;
