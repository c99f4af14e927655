pub mod cetes_repository;
pub mod fondo_repository;
pub mod sofipo_repository;
pub mod traits;

// Re-export all repositories for convenient access
pub use cetes_repository::CetesRepository;
pub use fondo_repository::FondoRepository;
pub use sofipo_repository::SofipoRepository;
pub use traits::{BatchOutcome, CetesStore, FondoStore, RepoResult, SofipoStore};
