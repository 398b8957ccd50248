pub mod error;
pub mod profiles;
pub mod realtime;
pub mod room;
pub mod session;

pub use error::ClientError;
pub use profiles::ProfileCache;
pub use realtime::{RealtimeClient, RoomEvent, Subscription};
pub use room::ChatRoom;
pub use session::Session;
