pub mod config;
pub mod domain;
pub mod errors;
pub mod knowledge;
pub mod memory;
pub mod nlp;
pub mod rotation;
pub mod session;

pub use domain::intent::{
    ContextFilters, DetectedProduct, EventScale, Intent, Occasion, PriceRange, QuestionKind,
    SensoryProfile, VolumeRange,
};
pub use domain::product::{NewProduct, Product, ProductId, ProductSummary};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use memory::{ContextualMemory, MemoryPolicy};
pub use nlp::IntentExtractor;
pub use rotation::RotationState;
pub use session::{SessionId, SessionState};
