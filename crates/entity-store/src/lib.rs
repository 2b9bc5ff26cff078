pub mod errors;
pub mod fault;
pub mod memory;
pub mod model;
pub mod observe;
pub mod snapshot;
pub mod spi;

pub use errors::{StoreError, StoreErrorKind};
pub use fault::StoreOp;
pub use memory::InMemoryEntityStore;
pub use model::*;
pub use snapshot::StoreSnapshot;
pub use spi::{EntityStore, StoreResult};
