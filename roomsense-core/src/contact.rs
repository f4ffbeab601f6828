//! Edge detection for binary contact switches
//!
//! Each contact keeps the last observed state in its own slot. A check
//! reports `Changed` when the new state differs from that slot, and stores
//! the new state.
//!
//! Before the first real reading the slot is empty, and the first check is
//! treated as if the previous state were the negation of what was read. The
//! very first check therefore always reports `Changed`, which forces an
//! initial publish of door and window state on startup.

use crate::metrics::ContactId;

/// Result of comparing a contact reading with the previous one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactChange {
    /// State differs from the previous observation (or is the first one)
    Changed {
        /// New state
        open: bool,
    },
    /// No transition
    Unchanged,
}

impl ContactChange {
    /// Whether the state flipped
    pub fn is_changed(self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}

/// Last-known state of both contacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContactState {
    /// Last door state, `None` before the first check
    pub door_open: Option<bool>,
    /// Last window state, `None` before the first check
    pub window_open: Option<bool>,
}

impl ContactState {
    fn slot(&mut self, contact: ContactId) -> &mut Option<bool> {
        match contact {
            ContactId::Door => &mut self.door_open,
            ContactId::Window => &mut self.window_open,
        }
    }

    /// Last known state of one contact
    pub fn get(&self, contact: ContactId) -> Option<bool> {
        match contact {
            ContactId::Door => self.door_open,
            ContactId::Window => self.window_open,
        }
    }
}

/// Tracks door and window transitions
#[derive(Debug, Clone, Default)]
pub struct ContactMonitor {
    previous: ContactState,
}

impl ContactMonitor {
    /// Monitor with no contact seen yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `open` against the previous observation of `contact`
    pub fn check(&mut self, contact: ContactId, open: bool) -> ContactChange {
        let slot = self.previous.slot(contact);
        // First observation: previous is seeded as the negation
        let previous = slot.unwrap_or(!open);

        *slot = Some(open);

        if previous != open {
            ContactChange::Changed { open }
        } else {
            ContactChange::Unchanged
        }
    }

    /// Last observed state of both contacts
    pub fn state(&self) -> ContactState {
        self.previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_check_reports_change_for_closed_door() {
        let mut monitor = ContactMonitor::new();

        // No physical transition, still reported once
        assert_eq!(
            monitor.check(ContactId::Door, false),
            ContactChange::Changed { open: false }
        );
        assert_eq!(monitor.check(ContactId::Door, false), ContactChange::Unchanged);
    }

    #[test]
    fn contacts_tracked_independently() {
        let mut monitor = ContactMonitor::new();
        assert!(monitor.check(ContactId::Door, true).is_changed());
        assert!(monitor.check(ContactId::Window, true).is_changed());

        assert!(monitor.check(ContactId::Door, false).is_changed());
        assert!(!monitor.check(ContactId::Window, true).is_changed());

        assert_eq!(monitor.state().door_open, Some(false));
        assert_eq!(monitor.state().window_open, Some(true));
    }

    proptest! {
        #[test]
        fn changed_iff_differs_from_previous(readings in prop::collection::vec(any::<bool>(), 1..64)) {
            let mut monitor = ContactMonitor::new();
            let mut previous: Option<bool> = None;

            for open in readings {
                let change = monitor.check(ContactId::Window, open);
                let expected = previous.map_or(true, |p| p != open);
                prop_assert_eq!(change.is_changed(), expected);
                previous = Some(open);
            }
        }
    }
}
