/// Which solver backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverChoice {
    #[default]
    Z3,
    Cvc5,
}

/// What happens to the false branch of an `if` that has no `else`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ElseFallthrough {
    /// Keep the false branch only when the `then` body produced no
    /// surviving states (every path through it returned).
    #[default]
    Drop,
    /// Always keep the false branch as a successor.
    Keep,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExploreOptions {
    pub solver: SolverChoice,
    /// Per-query solver timeout in seconds; 0 disables it.
    pub timeout_secs: u64,
    pub else_fallthrough: ElseFallthrough,
    pub entry: String,
    /// Overrides the `cvc5` binary when `solver` is `Cvc5`.
    pub cvc5_command: Option<String>,
}

impl Default for ExploreOptions {
    fn default() -> Self {
        Self {
            solver: SolverChoice::Z3,
            timeout_secs: 30,
            else_fallthrough: ElseFallthrough::Drop,
            entry: "main".to_string(),
            cvc5_command: None,
        }
    }
}

impl ExploreOptions {
    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = entry.into();
        self
    }

    pub fn with_else_fallthrough(mut self, mode: ElseFallthrough) -> Self {
        self.else_fallthrough = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = ExploreOptions::default();
        assert_eq!(options.solver, SolverChoice::Z3);
        assert_eq!(options.timeout_secs, 30);
        assert_eq!(options.else_fallthrough, ElseFallthrough::Drop);
        assert_eq!(options.entry, "main");
        assert!(options.cvc5_command.is_none());
    }

    #[test]
    fn builders() {
        let options = ExploreOptions::default()
            .with_entry("play_game")
            .with_else_fallthrough(ElseFallthrough::Keep);
        assert_eq!(options.entry, "play_game");
        assert_eq!(options.else_fallthrough, ElseFallthrough::Keep);
    }
}
