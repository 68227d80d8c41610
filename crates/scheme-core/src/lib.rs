pub mod body;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod id;
pub mod model;
pub mod pv;
pub mod route;
pub mod snapshot;
pub mod verify;

pub use error::{InputError, LoadError, SnapshotCodecError};
pub use geometry::{Bounds, CanvasView, Point, Viewport};
pub use graph::BoardGraph;
pub use id::{CardId, LineId};
pub use model::*;
pub use route::{LinePath, anchor_point, route_line};
pub use snapshot::{CardDto, LineDto, Snapshot};
