pub mod client;
pub mod config;
pub mod error;
pub mod format;
pub mod normalize;
pub mod profile;
pub mod reveal;
pub mod state;
pub mod submit;

// Re-export main types for convenience
pub use client::{AdvisorClient, SessionSummary};
pub use config::{Config, Theme};
pub use error::{ClientError, ClientResult};
pub use format::{render_turn, DisplayLine, LineKind, Rendered, Span, BULLET_GLYPH};
pub use normalize::{normalize, normalize_stored};
pub use profile::UserProfile;
pub use reveal::{step_size, RevealTimer};
pub use state::{ChatRole, ChatTurn, RevealProgress, Session, SessionId};
pub use submit::{begin_submission, complete_submission, Submission};
