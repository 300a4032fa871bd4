pub mod extract;
pub mod handlers;
pub mod server;

pub use extract::{AdminSession, ClientAddr, CurrentSession};
pub use handlers::{ApiError, AppState};
pub use server::{build_router, run_server};
