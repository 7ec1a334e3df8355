// ABOUTME: Type-safe identifiers shared by the runtime facade and commands.
// ABOUTME: Uses phantom types to prevent ID confusion at compile time.

mod id;

pub use id::{ContainerId, Id, ImageId, SHORT_ID_LEN};
