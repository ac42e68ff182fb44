pub mod airline;
pub mod airport;
pub mod entity;
pub mod error;
pub mod route;

pub use airline::Airline;
pub use airport::Airport;
pub use entity::{
    build_payload, diff_payload, filter_indices, visible_relations, Entity, EntityKind, FieldKind,
    FieldSpec, FormFields, RelationEntry,
};
pub use error::{ApiError, MutationError, ValidationError};
pub use route::{RouteLeg, RouteResult, Stats};
