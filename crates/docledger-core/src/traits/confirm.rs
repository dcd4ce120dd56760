//! Confirmation capability for destructive operations.

/// A yes/no decision supplied by the caller.
///
/// The library never prompts by itself; an interactive front end passes an
/// implementation that asks the user, scripts pass [`AlwaysConfirm`].
pub trait Confirm: Send + Sync {
    /// Return `true` to proceed.
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Confirms every prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}
