//! IDE workflow controller.
//!
//! Drives one editing session against the IDE API: loading or creating a
//! project, editing and saving files, and the `Idle → Compiling → Idle` and
//! `Idle → Deploying → Idle` runs whose logs the IDE renders.
//!
//! | Module       | Contents                                        |
//! |--------------|-------------------------------------------------|
//! | `client`     | `IdeApi` seam and its `reqwest` implementation  |
//! | `session`    | In-memory project, active file, logs            |
//! | `controller` | User actions and their failure handling         |

pub mod client;
pub mod config;
pub mod controller;
pub mod errors;
pub mod session;

pub use client::{HttpIdeApi, IdeApi};
pub use config::WorkflowConfig;
pub use controller::{Controller, DeployOutcome};
pub use errors::{Result, WorkflowError};
pub use session::{Notification, Session, WorkflowState};
