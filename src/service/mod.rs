//! CrudService: executes catalog-built statements on the shared pool.

mod crud;
pub use crud::CrudService;
