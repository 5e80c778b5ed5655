//! In-process simulated game server for afkbot unit and integration testing.
//!
//! [`SimClient`] implements [`afkbot_domain::GameClient`] without sockets.
//! [`SimConfig`] controls scripted behaviour:
//!
//! - Spawn delay, or fully manual lifecycle
//! - Failing the first N connect attempts
//! - Kicking a live session after a duration
//! - The world each session starts from ([`SimWorld`])
//!
//! # Quick start
//!
//! ```rust,ignore
//! use afkbot_sim::{SimClient, SimConfig};
//!
//! let client = SimClient::new(SimConfig::manual());
//! // hand `client` to the agent, then:
//! client.last_session().unwrap().kick("banned");
//! ```

mod config;
mod session;
mod transport;
mod world;

// --- public API
pub use config::SimConfig;
pub use session::{SimCall, SimSession};
pub use transport::SimClient;
pub use world::SimWorld;
