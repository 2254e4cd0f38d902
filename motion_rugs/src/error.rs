// THEORY:
// The `error` module collects every failure the motion rug core can report. Each
// layer of the pipeline owns one error enum so that callers can tell *where* a
// message was refused: while loading configuration, while validating an inbound
// frame, while resequencing it, or while turning the window into pixels.
//
// None of these are fatal to a running processor. A rejected frame is simply not
// admitted; the next cadence tick recomputes everything from the window, which is
// the system's only recovery mechanism.

use thiserror::Error;

/// Problems found while loading or validating a `RugConfig`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("at least one strategy must be configured")]
    NoStrategies,

    #[error("at least one feature must be configured")]
    NoFeatures,

    #[error("unknown ordering strategy `{0}` (expected `HilbertOrder` or `zOrder`)")]
    UnknownStrategy(String),

    #[error("`{0}` is configured more than once")]
    Duplicate(String),

    #[error("redraw interval must be at least one frame")]
    ZeroRedrawInterval,

    #[error("pixel max width must be at least one column")]
    ZeroWidth,

    #[error("palette must hold exactly {expected} colors, got {actual}")]
    PaletteLength { expected: usize, actual: usize },

    #[error("palette entry `{0}` is not a #RRGGBB color")]
    BadColor(String),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("failed to read config file: {0}")]
    Io(String),
}

/// Reasons an inbound frame is refused before it reaches the sequencer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IngestError {
    #[error("frame {frame} carries no readings")]
    EmptyFrame { frame: u64 },

    #[error("frame {frame}: reading {index} has no `{feature}` value")]
    MissingFeature { frame: u64, index: usize, feature: String },

    #[error("frame {frame}: reading {index} has a non-finite GPS position")]
    InvalidPosition { frame: u64, index: usize },

    #[error("frame {frame} carries {actual} readings but the stream tracks {expected} objects")]
    ObjectCountMismatch { frame: u64, expected: usize, actual: usize },
}

/// Sequence-number violations the bounded resequencer refuses to buffer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SequenceError {
    #[error("frame {frame} arrived after frame {next_expected} was already expected")]
    Stale { frame: u64, next_expected: u64 },

    #[error("frame {frame} is more than {limit} frames ahead of expected frame {next_expected}")]
    TooFarAhead { frame: u64, next_expected: u64, limit: u64 },
}

/// Contract violations detected while synthesizing a rug image.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("column {column} holds {actual} rows but the rug is {expected} rows tall")]
    RaggedWindow { column: usize, expected: usize, actual: usize },

    #[error("no deciles have been computed for feature `{0}`")]
    MissingDeciles(String),

    #[error("rug of {width}x{height} pixels does not fit an image buffer")]
    Oversized { width: usize, height: usize },
}

/// Top-level error for the motion rug core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RugError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Sequence(#[from] SequenceError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

pub type Result<T> = std::result::Result<T, RugError>;
