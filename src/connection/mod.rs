// Push-channel connection management: state machine, retry timer, socket driver.

pub mod scheduler;
pub mod socket;
mod state;

pub use scheduler::RetryTimer;
pub use socket::{SocketEvent, SocketHandle, push_url};
pub use state::{
    ConnectionManager, ConnectionSignal, ConnectionState, Effect, Generation, ReconnectPolicy,
};
