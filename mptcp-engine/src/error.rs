use thiserror::Error;

/// Errors the engine can surface while rewriting or verifying a packet's
/// MPTCP options.
///
/// The engine never catches one of these internally: the first error
/// encountered for a packet aborts that packet's processing and unwinds to
/// the host, which reports the offending script line. There is no partial
/// rollback of state mutations already applied to earlier options in the
/// same packet.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A malformed or unexpected MPTCP option for the current packet's
    /// flags/direction/length.
    #[error("MPTCP option error: {0}")]
    Option(String),

    /// A precondition was violated: a queued variable name was required but
    /// absent, a binding was the wrong subtype, or a derived value
    /// (`initial_dsn`/`initial_dack`) was read before both session keys
    /// were known.
    #[error("MPTCP state error: {0}")]
    State(String),

    /// A bounded resource (the pending-variable queue) was exhausted.
    #[error("MPTCP resource error: {0}")]
    Resource(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    pub fn option(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::warn!(error = %msg, "mptcp option error");
        Self::Option(msg)
    }

    pub fn state(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::warn!(error = %msg, "mptcp state error");
        Self::State(msg)
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::warn!(error = %msg, "mptcp resource error");
        Self::Resource(msg)
    }
}
