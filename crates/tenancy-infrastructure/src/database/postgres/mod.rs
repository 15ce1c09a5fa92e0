//! PostgreSQL store implementation

pub mod descriptor;
pub mod session;
pub mod source;

pub use descriptor::to_pg_options;
pub use session::PgStoreSession;
pub use source::PgSessionSource;
