//! Resource Module
//!
//! The generic CRUD layer behind every `/api/...` collection. A resource is
//! described once in [`crate::catalog`] and gets list, get, create, update
//! and delete without any resource-specific handler code.
//!
//! # Usage
//!
//! ```rust,ignore
//! use lifedesk::{catalog, resource};
//!
//! let app = Router::new()
//!     .nest("/notes", resource::routes(&catalog::NOTES))
//!     .with_state(app_state);
//!
//! // Or use the accessor directly
//! let lib = resource::ResourceAccessor::new(&db);
//! let note = lib.create(&catalog::NOTES, &payload).await?;
//! ```

mod accessor;
pub mod guard;
mod handler;
mod routes;
pub mod validation;

pub use accessor::ResourceAccessor;
pub use routes::routes;
