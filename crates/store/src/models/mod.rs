pub mod member;
pub mod message;
pub mod profile;
pub mod project;

pub use member::{MemberRole, MemberStatus, ProjectMember};
pub use message::{DeliveryStatus, Message, MessageKind, NewMessage, SystemPayload};
pub use profile::Profile;
pub use project::Project;
