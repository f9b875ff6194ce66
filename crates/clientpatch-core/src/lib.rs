mod config;
mod layout;
mod record;

pub use config::{PatchConfig, DEFAULT_VOLATILE_DIRS};
pub use layout::PatchLayout;
pub use record::{record_timestamp, GeneratedRecord, InstalledFile, SessionRecord};

#[cfg(test)]
mod tests;
