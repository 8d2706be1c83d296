mod error;
mod page;
mod record;
mod schema;
mod table_handle;
mod value;

pub use error::{RecordError, RecordResult};
pub use page::SlottedPage;
pub use record::{Record, RecordId, SlotId};
pub use schema::{Field, RecordSchema};
pub use table_handle::{TableHandle, TableRef};
pub use value::{FieldType, Value};

pub(crate) use table_handle::lock;
