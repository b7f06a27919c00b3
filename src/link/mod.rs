//! # Printer Link
//!
//! Everything between "find a printer" and "the printer is ready for data":
//! scan results, the connection state machine, the liveness watchdog and the
//! session task that drives them.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`state`] | Link lifecycle states |
//! | [`discovery`] | Scan result ranking and distance estimate |
//! | [`timer`] | Scan countdown and liveness watchdog |
//! | [`session`] | The session task and its handle |

pub mod discovery;
pub mod session;
pub mod state;
pub mod timer;

pub use discovery::{DeviceList, DiscoveredDevice};
pub use session::{ScanSnapshot, Session, SessionEvent, SessionHandle};
pub use state::LinkState;
