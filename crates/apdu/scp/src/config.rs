//! Configuration options for a security domain session

/// Default bound on GET RESPONSE rounds for a single command
pub const DEFAULT_MAX_GET_RESPONSE: usize = 10;

/// Configuration options for a security domain session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Maximum number of GET RESPONSE commands issued after a `61xx` status
    pub max_get_response: usize,

    /// Split oversized plain commands with ISO 7816 command chaining when
    /// the transport lacks extended length support
    pub command_chaining: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_get_response: DEFAULT_MAX_GET_RESPONSE,
            command_chaining: true,
        }
    }
}

impl SessionConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the GET RESPONSE bound
    pub const fn with_max_get_response(mut self, max_get_response: usize) -> Self {
        self.max_get_response = max_get_response;
        self
    }

    /// Set whether plain commands may be chained
    pub const fn with_command_chaining(mut self, command_chaining: bool) -> Self {
        self.command_chaining = command_chaining;
        self
    }
}
