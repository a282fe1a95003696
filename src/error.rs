//! Application error taxonomy.
//!
//! Variants are grouped by how callers recover:
//!
//! - `Schema` / `Export` / `Fetch`: fatal, surfaced immediately
//! - `NotFound`: fatal to the requesting call (no silent defaulting)
//! - `Convergence` / `IllConditioned`: recoverable at the granularity of one
//!   (entity, train, threshold) record — batch sweeps mark the record failed
//!   and keep going

#[derive(Clone, PartialEq, Eq)]
pub enum AppError {
    /// Malformed input shape (odd column count, empty cell, bad rows).
    Schema(String),
    /// A requested cell or train label does not exist.
    NotFound(String),
    /// The minimizer did not reach its stopping tolerance within budget.
    Convergence(String),
    /// Degenerate fit input (too few points, constant x or y).
    IllConditioned(String),
    /// Failed to write an export file.
    Export(String),
    /// Remote data fetch failed.
    Fetch(String),
}

impl AppError {
    pub fn schema(message: impl Into<String>) -> Self {
        AppError::Schema(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn convergence(message: impl Into<String>) -> Self {
        AppError::Convergence(message.into())
    }

    pub fn ill_conditioned(message: impl Into<String>) -> Self {
        AppError::IllConditioned(message.into())
    }

    pub fn export(message: impl Into<String>) -> Self {
        AppError::Export(message.into())
    }

    pub fn fetch(message: impl Into<String>) -> Self {
        AppError::Fetch(message.into())
    }

    /// Process exit code for the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Schema(_) | AppError::Export(_) | AppError::Fetch(_) => 2,
            AppError::NotFound(_) => 3,
            AppError::Convergence(_) | AppError::IllConditioned(_) => 4,
        }
    }

    /// True for errors a batch sweep may record and skip past.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AppError::Convergence(_) | AppError::IllConditioned(_))
    }

    fn message(&self) -> &str {
        match self {
            AppError::Schema(m)
            | AppError::NotFound(m)
            | AppError::Convergence(m)
            | AppError::IllConditioned(m)
            | AppError::Export(m)
            | AppError::Fetch(m) => m,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::Schema(_) => "schema",
            AppError::NotFound(_) => "not-found",
            AppError::Convergence(_) => "convergence",
            AppError::IllConditioned(_) => "ill-conditioned",
            AppError::Export(_) => "export",
            AppError::Fetch(_) => "fetch",
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind())
            .field("exit_code", &self.exit_code())
            .field("message", &self.message())
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_taxonomy() {
        assert_eq!(AppError::schema("x").exit_code(), 2);
        assert_eq!(AppError::not_found("x").exit_code(), 3);
        assert_eq!(AppError::convergence("x").exit_code(), 4);
        assert_eq!(AppError::ill_conditioned("x").exit_code(), 4);
    }

    #[test]
    fn only_fit_errors_are_recoverable() {
        assert!(AppError::convergence("x").is_recoverable());
        assert!(AppError::ill_conditioned("x").is_recoverable());
        assert!(!AppError::schema("x").is_recoverable());
        assert!(!AppError::not_found("x").is_recoverable());
    }
}
