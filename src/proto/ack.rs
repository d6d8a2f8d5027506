// Bytes-read accounting

/// Default acknowledgement window
pub const DEFAULT_WINDOW_SIZE: u32 = 2_500_000;

/// Tracks received bytes and decides when a PROTO_ACK is due
///
/// Acks go out every half window, the way Adobe's software does it.
pub struct AckController {
    bytes_read: u64,
    window_size: u32,
    next_ack: u64,
}

impl Default for AckController {
    fn default() -> AckController {
        AckController::new()
    }
}

impl AckController {
    pub fn new() -> AckController {
        let mut controller = AckController {
            bytes_read: 0,
            window_size: DEFAULT_WINDOW_SIZE,
            next_ack: 0,
        };
        controller.advance_next_ack(0);
        controller
    }

    /// Total bytes accounted so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Current window size
    pub fn window_size(&self) -> u32 {
        self.window_size
    }

    fn advance_next_ack(&mut self, old_window_size: u32) {
        let old_inc = (old_window_size / 2) as u64;
        let inc = (self.window_size / 2) as u64;
        self.next_ack = self.next_ack + inc - old_inc;
    }

    fn check_ack_due(&mut self) -> Option<u32> {
        if self.next_ack < self.bytes_read {
            self.advance_next_ack(0);
            return Some((self.bytes_read % 0x1_0000_0000) as u32);
        }
        None
    }

    /// Accounts received bytes; returns the sequence number to
    /// acknowledge when the threshold was crossed
    pub fn bytes_received(&mut self, count: usize) -> Option<u32> {
        self.bytes_read += count as u64;
        self.check_ack_due()
    }

    /// Applies a window size announced by the peer, rebasing the next
    /// ack threshold
    pub fn set_window_size(&mut self, new_size: u32) -> Option<u32> {
        if new_size == self.window_size {
            return None;
        }

        let old_size = self.window_size;
        self.window_size = new_size;
        self.advance_next_ack(old_size);
        self.check_ack_due()
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_every_half_window() {
        let mut controller = AckController::new();

        assert_eq!(controller.bytes_received(1_000_000), None);

        // crossing half the window (1,250,000) triggers an ack with
        // the running byte count
        assert_eq!(controller.bytes_received(300_000), Some(1_300_000));

        // no ack until the next half-window step
        assert_eq!(controller.bytes_received(1_000_000), None);
        assert_eq!(controller.bytes_received(300_000), Some(2_600_000));
    }

    #[test]
    fn test_window_change_rebases_threshold() {
        let mut controller = AckController::new();

        assert_eq!(controller.bytes_received(1_000_000), None);

        // shrinking the window may make an ack immediately due
        assert_eq!(controller.set_window_size(1_000_000), Some(1_000_000));

        // catching up half a window at a time
        assert_eq!(controller.bytes_received(400_000), Some(1_400_000));
        assert_eq!(controller.bytes_received(100_000), None);
        assert_eq!(controller.bytes_received(100_000), Some(1_600_000));
    }
}
