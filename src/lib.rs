pub mod clock;
pub mod event;
pub mod layout;
pub mod memory;
pub mod name;
pub mod session;
pub mod value;

// Re-export the surface the attachment layer and consumer actually touch.
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use event::{CausalIds, FieldWriteEvent, ProcessEvent, RemoteWriteEvent};
pub use memory::{BufferMemory, ForeignMemory, ReadError};
pub use name::{EntityName, FieldName, LinkName};
pub use session::{EventClass, EventStreams, SessionConfig, TraceSession};
pub use value::{extract, ExtractedValue, FieldType};
