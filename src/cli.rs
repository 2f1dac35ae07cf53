//! Minimal flag parsing for startup modes.

use std::env;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SeedMode {
    #[default]
    Skip,
    /// Load the sample catalog, then serve.
    Seed,
    /// Load the sample catalog and exit.
    SeedOnly,
}

#[derive(Debug, Default)]
pub struct CliOptions {
    pub seed: SeedMode,
}

impl CliOptions {
    pub fn from_args() -> Self {
        Self::parse(env::args().skip(1))
    }

    fn parse(args: impl IntoIterator<Item = String>) -> Self {
        let mut options = CliOptions::default();
        for arg in args {
            match arg.as_str() {
                "--seed" if options.seed == SeedMode::Skip => options.seed = SeedMode::Seed,
                "--seed-only" => options.seed = SeedMode::SeedOnly,
                other => tracing::warn!(arg = other, "ignoring unknown argument"),
            }
        }
        options
    }
}
