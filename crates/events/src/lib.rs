//! LearnHub event bus, mail delivery and background counter maintenance.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the domain event envelope.
//! - [`delivery`]: templated SMTP email and best-effort mail dispatch.
//! - [`RecountQueue`]: coalescing background queue for org unit counters.

pub mod bus;
pub mod delivery;
pub mod recount;

pub use bus::{EventBus, PlatformEvent};
pub use delivery::dispatch::MailDispatcher;
pub use delivery::email::{EmailConfig, EmailDelivery, EmailError, MailRenderer, TemplatedMail};
pub use recount::{RecountConfig, RecountQueue, RecountWorker};
