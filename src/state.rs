//! Shared application state for all routes.

use crate::service::CrudService;

#[derive(Clone)]
pub struct AppState {
    /// Owns the pool; built once in main and handed to the router.
    pub crud: CrudService,
}
