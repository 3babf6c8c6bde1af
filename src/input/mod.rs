pub mod record;

pub use record::{InputRecord, RecordKind, RecordSource};
