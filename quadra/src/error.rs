use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown {kind} id {id}")]
    UnknownId { kind: &'static str, id: u32 },

    #[error("parameter '{0}' must be finite")]
    NonFinite(&'static str),

    #[error("parameter '{param}' out of range [{min}, {max}]: {got}")]
    OutOfRange { param: &'static str, min: f64, max: f64, got: f64 },

    #[error("edge endpoints cannot be the same node ({0})")]
    SelfLoop(u32),

    #[error("node {0} is a roundabout port; edit the roundabout instead")]
    PortLocked(u32),

    #[error("polygon is degenerate after normalization")]
    InvalidPolygon,

    #[error("lot polygon is not contained in block {0}")]
    LotOutsideBlock(u32),

    #[error("invalid generation options: {0}")]
    InvalidOptions(String),

    #[error("block {0} has no persisted grid parameters")]
    NoGridParams(u32),

    #[error("failed to decode snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),

    #[error("{what} exceeds limit of {limit}")]
    LimitExceeded { what: &'static str, limit: usize },

    #[error("coordinate out of bounds in {0}")]
    CoordOutOfBounds(&'static str),
}

impl Error {
    /// Stable machine-readable code, shared with the binding layer.
    pub fn code(&self) -> &'static str {
        match self {
            Error::UnknownId { .. } => "invalid_id",
            Error::NonFinite(_) => "non_finite",
            Error::OutOfRange { .. } => "out_of_range",
            Error::SelfLoop(_) => "invalid_edge",
            Error::PortLocked(_) => "port_locked",
            Error::InvalidPolygon => "invalid_polygon",
            Error::LotOutsideBlock(_) => "lot_outside_block",
            Error::InvalidOptions(_) => "invalid_options",
            Error::NoGridParams(_) => "no_grid_params",
            Error::Json(_) => "json_parse",
            Error::UnsupportedVersion(_) => "unsupported_version",
            Error::LimitExceeded { .. } => "limit_exceeded",
            Error::CoordOutOfBounds(_) => "coord_out_of_bounds",
        }
    }

    pub(crate) fn unknown(kind: &'static str, id: u32) -> Self {
        Error::UnknownId { kind, id }
    }
}

pub type TopologyError = Error;

pub type Result<T> = std::result::Result<T, Error>;
