// ABOUTME: Library module for the cardstore backing store
// ABOUTME: Exports the database handle, document model and flat-file import/export

pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod import;
pub mod maintenance;
pub mod model;
pub mod sqlite;

pub use config::StoreConfig;
pub use database::Database;
pub use error::{Result, StoreError};
pub use maintenance::VacuumStats;
pub use model::{
    CardDocument, CardType, Color, DetailDocument, FaqDocument, ImageDocument, Language, Rarity,
    Side,
};
