pub mod client_provider;
pub mod registry_reader;
pub mod remote_client;
pub mod ui;
pub mod workspace_state;

pub use client_provider::{ClientProvider, ClientRegistry};
pub use registry_reader::{RegQueryReader, RegistryReader, parse_reg_query_output};
pub use remote_client::RemoteClient;
pub use ui::UiSurface;
pub use workspace_state::{FileWorkspaceState, WorkspaceState};
