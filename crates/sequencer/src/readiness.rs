/// One-shot gate: opens the first time its condition holds and never again.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessGate {
    fired: bool,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` exactly once: on the first call where `ready` holds.
    pub fn poll(&mut self, ready: bool) -> bool {
        if self.fired || !ready {
            return false;
        }
        self.fired = true;
        true
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_on_first_ready_poll() {
        let mut gate = ReadinessGate::new();
        assert!(!gate.poll(false));
        assert!(!gate.has_fired());
        assert!(gate.poll(true));
        assert!(!gate.poll(true));
        assert!(!gate.poll(false));
        assert!(gate.has_fired());
    }
}
