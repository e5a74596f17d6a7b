// Service modules
pub(crate) mod database;
pub mod http_server;
pub mod process;
pub mod service_config;
pub mod service_state;
pub mod storage;

// Client side
pub mod session;

// App state (configuration, paths)
pub mod state;

pub use database::{Database, DatabaseSetupError};
pub use process::{spawn_service, start_service, ShutdownHandle};
pub use service_config::Config as ServiceConfig;
pub use service_state::State as ServiceState;
pub use session::{Session, SessionError};
pub use state::{AppConfig, AppState, StateError};
pub use storage::{SecretStore, StorageError};
