//! Redis key layout for a queue and its satellite structures.
//!
//! All keys share the `courier:queue:` prefix so a running system can be
//! inspected with `KEYS courier:queue:*`.

/// Pending list — jobs waiting for a consumer (LPUSH producer side,
/// BLMOVE consumer side).
pub fn pending(queue: &str) -> String {
    format!("courier:queue:{queue}")
}

/// Per-consumer processing list — jobs handed to `consumer` but not yet
/// acked. Drained back to pending when the consumer restarts.
pub fn processing(queue: &str, consumer: &str) -> String {
    format!("courier:queue:{queue}:processing:{consumer}")
}

/// Delayed zset — nacked jobs scheduled for redelivery, scored by the unix
/// millisecond timestamp they become due.
pub fn delayed(queue: &str) -> String {
    format!("courier:queue:{queue}:delayed")
}

/// Dead list — jobs that exhausted their attempts. Parked, never dropped.
pub fn dead(queue: &str) -> String {
    format!("courier:queue:{queue}:dead")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(pending("notification"), "courier:queue:notification");
        assert_eq!(
            processing("notification", "worker-0"),
            "courier:queue:notification:processing:worker-0"
        );
        assert_eq!(delayed("notification"), "courier:queue:notification:delayed");
        assert_eq!(dead("notification"), "courier:queue:notification:dead");
    }
}
