//! Outernet tunnel control.
//!
//! ```text
//! Disconnected -> Connecting -> SettingUp -> AddingRoute -> Connected
//!                     |             |             |             |
//!                     +---> Error --+-------------+             |
//!                             |                                 |
//!                             +--------> Disconnecting <--------+
//!                                             |
//!                                             v
//!                                        Disconnected
//! ```

mod controller;
mod lifecycle;
mod settings;
mod state;

pub use controller::Controller;
pub use lifecycle::ControlError;
pub use settings::NetworkSettings;
pub use state::{ControlState, StateChange, StateReceiver};
