//! Configuration for the structuring engine and the decompiler driver.

/// Configuration for the structuring engine.
///
/// Controls which idioms the engine recovers, how failures degrade and how the
/// driver schedules work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompilerConfig {
    /// Structure classes on the rayon thread pool (default: true).
    pub parallel: bool,

    /// Collapse value-producing diamonds into `c ? a : b` (default: true).
    pub recover_ternaries: bool,

    /// Promote `init; while (cond) { ...; incr }` to `for` (default: true).
    pub recover_for_loops: bool,

    /// Rewrite `x = x op v` as `x op= v` (default: true).
    pub recover_compound_assignments: bool,

    /// Fold `load; iinc` and `iinc; load` into `i++` / `++i` expressions (default: true).
    pub recover_increments: bool,

    /// Render unstructurable methods as labels and jumps instead of failing
    /// them (default: true).
    pub fallback_on_failure: bool,

    /// Maximum number of branch blocks folded into one short-circuit
    /// condition (default: 32).
    pub max_condition_chain: usize,
}

impl Default for DecompilerConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            recover_ternaries: true,
            recover_for_loops: true,
            recover_compound_assignments: true,
            recover_increments: true,
            fallback_on_failure: true,
            max_condition_chain: 32,
        }
    }
}

impl DecompilerConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Disables every optional idiom so the output stays close to the bytecode.
    ///
    /// Loops, conditionals and switches are still structured; ternaries,
    /// `for` loops, compound assignments and increment expressions are not
    /// recovered, and conditions are never chained.
    #[must_use]
    pub fn literal() -> Self {
        Self {
            recover_ternaries: false,
            recover_for_loops: false,
            recover_compound_assignments: false,
            recover_increments: false,
            max_condition_chain: 1,
            ..Self::default()
        }
    }

    /// Sets [`parallel`](Self::parallel).
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets [`recover_ternaries`](Self::recover_ternaries).
    #[must_use]
    pub fn with_ternaries(mut self, enabled: bool) -> Self {
        self.recover_ternaries = enabled;
        self
    }

    /// Sets [`recover_for_loops`](Self::recover_for_loops).
    #[must_use]
    pub fn with_for_loops(mut self, enabled: bool) -> Self {
        self.recover_for_loops = enabled;
        self
    }

    /// Sets [`recover_compound_assignments`](Self::recover_compound_assignments).
    #[must_use]
    pub fn with_compound_assignments(mut self, enabled: bool) -> Self {
        self.recover_compound_assignments = enabled;
        self
    }

    /// Sets [`recover_increments`](Self::recover_increments).
    #[must_use]
    pub fn with_increments(mut self, enabled: bool) -> Self {
        self.recover_increments = enabled;
        self
    }

    /// Sets [`fallback_on_failure`](Self::fallback_on_failure).
    #[must_use]
    pub fn with_fallback(mut self, enabled: bool) -> Self {
        self.fallback_on_failure = enabled;
        self
    }

    /// Sets [`max_condition_chain`](Self::max_condition_chain). Values below 1
    /// are raised to 1.
    #[must_use]
    pub fn with_max_condition_chain(mut self, max: usize) -> Self {
        self.max_condition_chain = max.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DecompilerConfig::default();
        assert!(config.parallel);
        assert!(config.recover_ternaries);
        assert!(config.fallback_on_failure);
        assert_eq!(config.max_condition_chain, 32);
        assert_eq!(config, DecompilerConfig::new());
    }

    #[test]
    fn test_literal_preset() {
        let config = DecompilerConfig::literal();
        assert!(!config.recover_ternaries);
        assert!(!config.recover_for_loops);
        assert!(config.fallback_on_failure);
        assert_eq!(config.max_condition_chain, 1);
    }

    #[test]
    fn test_builders() {
        let config = DecompilerConfig::new()
            .with_parallel(false)
            .with_for_loops(false)
            .with_max_condition_chain(0);
        assert!(!config.parallel);
        assert!(!config.recover_for_loops);
        assert_eq!(config.max_condition_chain, 1);
    }
}
