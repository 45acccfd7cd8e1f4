use std::fmt;

/// Logical clock attached to every mutation event in the source change log.
///
/// [`LogicalClock`] is an ordered (epoch, counter) pair with lexicographic
/// total order, epoch first. It sequences events for one document regardless
/// of the order in which they arrive from the tailer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogicalClock {
    /// Coarse clock component, compared first.
    pub epoch: u32,
    /// Per-epoch counter, compared second.
    pub counter: u32,
}

impl LogicalClock {
    /// Creates a new clock from its components.
    pub fn new(epoch: u32, counter: u32) -> Self {
        Self { epoch, counter }
    }

    /// Packs the clock into a single monotonically comparable timestamp.
    ///
    /// The packed form `(epoch << 32) | counter` preserves the lexicographic
    /// order of the pair and is what [`crate::types::ActionRecord`]s carry as
    /// their version token.
    pub fn as_timestamp(&self) -> i64 {
        ((self.epoch as i64) << 32) | self.counter as i64
    }
}

impl fmt::Display for LogicalClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.epoch, self.counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_lexicographic_epoch_first() {
        assert!(LogicalClock::new(1, 0) > LogicalClock::new(0, 100));
        assert!(LogicalClock::new(1, 2) > LogicalClock::new(1, 1));
        assert_eq!(LogicalClock::new(3, 4), LogicalClock::new(3, 4));
    }

    #[test]
    fn packed_timestamp_preserves_order() {
        let a = LogicalClock::new(0, u32::MAX);
        let b = LogicalClock::new(1, 0);
        assert!(a.as_timestamp() < b.as_timestamp());
    }
}
