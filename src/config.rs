// user-level call frames allowed before a run fails with StackOverflow
pub const DEFAULT_MAX_CALL_DEPTH: usize = 2_000;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub max_call_depth: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            // set default values here, unless overridden via command-line
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}
