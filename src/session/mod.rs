pub mod catalog;
pub mod controller;
pub mod event;
pub mod pattern;
pub mod state;
pub mod telemetry;
pub mod throttle;

pub use catalog::{Catalog, Reference, ReferenceEntry};
pub use controller::{SessionController, SessionHandle, SessionOutcome};
pub use event::SessionEvent;
pub use pattern::{plan_bar, BarPlan, CueSlot};
pub use state::{Phase, Session};
pub use telemetry::{Pulse, Telemetry};
pub use throttle::SampleThrottle;
