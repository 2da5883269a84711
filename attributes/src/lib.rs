pub mod alert;
pub mod catalog;
pub mod config;
pub mod error;
mod fixture;
pub mod reconciler;
pub mod scopes;
pub mod service;
pub mod subject;
pub mod submission;

pub use alert::{Alert, AlertLevel};
pub use catalog::{Catalog, SelectedDialect, load_catalog};
pub use config::{AttributeFeatures, Config, ReconcilerConfig};
pub use error::{Error, MappingError, ValidationError};
pub use reconciler::{AttributeEvent, AttributeState, ClaimFlags};
pub use service::{AttributeService, Loaded, Updated};
pub use submission::{AdvancedSettings, Submission, build_submission};
