//! Global visibility suppression.
//!
//! Several independent features can need the terminal screen area at the
//! same time (a command palette, a modal, a drag overlay). Each pushes a
//! named reason; terminals are visible only while no reason is held. A
//! multiset rather than a flag, so concurrent requesters never clobber each
//! other.

/// Stack of named suppression reasons.
#[derive(Debug, Default)]
pub struct SuppressionStack {
    reasons: Vec<String>,
}

impl SuppressionStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold a reason. The same name may be held multiple times and must be
    /// released once per hold.
    pub fn hold(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        log::debug!("suppression hold: {reason}");
        self.reasons.push(reason);
    }

    /// Release one hold of `reason`. Releasing a reason that is not held is
    /// logged and ignored.
    pub fn release(&mut self, reason: &str) {
        match self.reasons.iter().rposition(|r| r == reason) {
            Some(i) => {
                self.reasons.remove(i);
                log::debug!("suppression release: {reason}");
            }
            None => log::warn!("suppression release for unheld reason: {reason}"),
        }
    }

    /// Terminals may be visible iff this is true.
    pub fn is_empty(&self) -> bool {
        self.reasons.is_empty()
    }

    pub fn active_reasons(&self) -> &[String] {
        &self.reasons
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stack_allows_visibility() {
        assert!(SuppressionStack::new().is_empty());
    }

    #[test]
    fn concurrent_holders_do_not_clobber_each_other() {
        let mut stack = SuppressionStack::new();
        stack.hold("palette");
        stack.hold("modal");
        stack.release("palette");
        assert!(!stack.is_empty(), "modal still holds");
        stack.release("modal");
        assert!(stack.is_empty());
    }

    #[test]
    fn same_reason_held_twice_needs_two_releases() {
        let mut stack = SuppressionStack::new();
        stack.hold("overlay");
        stack.hold("overlay");
        stack.release("overlay");
        assert!(!stack.is_empty());
        stack.release("overlay");
        assert!(stack.is_empty());
    }

    #[test]
    fn releasing_unheld_reason_is_ignored() {
        let mut stack = SuppressionStack::new();
        stack.release("ghost");
        assert!(stack.is_empty());
    }
}
