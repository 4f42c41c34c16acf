/// Convenience result type used across mapflow.
pub type MapflowResult<T> = Result<T, MapflowError>;

/// Failure raised by a tile fetcher.
///
/// Every variant is recoverable from the renderer's point of view: the affected tile region is
/// left transparent.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The remote answered with a non-success status code.
    #[error("fetch '{url}' failed with status {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// Connection, timeout or protocol failure before a status was received.
    #[error("fetch '{url}' failed: {message}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Transport-level error description.
        message: String,
    },

    /// Local file could not be read.
    #[error("read '{path}' failed: {message}")]
    Io {
        /// Resolved file path.
        path: String,
        /// IO error description.
        message: String,
    },
}

/// Top-level error taxonomy used by the rendering graph.
#[derive(thiserror::Error, Debug)]
pub enum MapflowError {
    /// Two pads carry different content tags.
    #[error("type mismatch: cannot connect {output} ({output_tag}) to {input} ({input_tag})")]
    TypeMismatch {
        /// Output pad description (`node:pad`).
        output: String,
        /// Output pad content tag.
        output_tag: String,
        /// Input pad description (`node:pad`).
        input: String,
        /// Input pad content tag.
        input_tag: String,
    },

    /// A pad was used against its direction (e.g. an input pad as a connection source).
    #[error("direction error: {0}")]
    Direction(String),

    /// Coordinates could not be transformed between reference systems.
    #[error("projection error: {0}")]
    Projection(String),

    /// A tile or remote resource could not be fetched.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A node could not be built from its configuration.
    #[error("cannot construct node '{node}': {reason}")]
    NodeConstruction {
        /// Configured node name.
        node: String,
        /// Human-readable failure reason.
        reason: String,
    },

    /// A referenced node does not exist in the pipeline.
    #[error("unknown node '{0}'")]
    MissingNode(String),

    /// A referenced pad does not exist on its node.
    #[error("unknown pad '{0}'")]
    MissingPad(String),

    /// Invalid user-provided values (envelopes, sizes, configuration).
    #[error("validation error: {0}")]
    Validation(String),

    /// Raster bytes could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MapflowError {
    /// Build a [`MapflowError::Direction`] value.
    pub fn direction(msg: impl Into<String>) -> Self {
        Self::Direction(msg.into())
    }

    /// Build a [`MapflowError::Projection`] value.
    pub fn projection(msg: impl Into<String>) -> Self {
        Self::Projection(msg.into())
    }

    /// Build a [`MapflowError::NodeConstruction`] value.
    pub fn node_construction(node: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NodeConstruction {
            node: node.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`MapflowError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`MapflowError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`MapflowError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Return `true` for errors that degrade a render region instead of failing it.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Projection(_) | Self::Fetch(_) | Self::Decode(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
