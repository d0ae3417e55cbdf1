mod error;
mod menu;
mod models;
pub mod records;

pub use error::{MenuError, MenuResult, StoreError, StoreResult};
pub use menu::{DelimitedRegistryWriter, MenuStore, RegistryWriter};
pub use models::{
    next_status, ChapterReference, MenuPatch, MenuRow, PageRecord, PLACEHOLDER_ID,
    STATUS_COMPLETE, STATUS_IN_PROGRESS,
};
pub use records::Lookup;
