//! Chronologically sortable child keys, same layout as Firebase push ids.
//!
//! 8 chars of millisecond timestamp + 12 random chars, all drawn from an
//! alphabet whose ASCII order matches its value order. Keys generated within
//! the same millisecond bump the random suffix so they still sort in creation
//! order.

use std::sync::{Mutex, PoisonError};

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";
const RANDOM_LEN: usize = 12;

#[derive(Default)]
struct LastKey {
    millis: i64,
    random: [u8; RANDOM_LEN],
}

/// Thread-safe push id generator.
#[derive(Default)]
pub struct PushIdGenerator {
    last: Mutex<LastKey>,
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id using the wall clock.
    pub fn next_id(&self) -> String {
        self.next_id_at(chrono::Utc::now().timestamp_millis())
    }

    /// Next id for a given timestamp in milliseconds.
    pub fn next_id_at(&self, millis: i64) -> String {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);

        // Clock went backwards or same tick: stay on the last timestamp and bump.
        if millis <= last.millis {
            increment(&mut last.random);
        } else {
            last.millis = millis;
            last.random = fresh_random();
        }

        let mut id = String::with_capacity(8 + RANDOM_LEN);
        let mut ts = last.millis.max(0) as u64;
        let mut stamp = [0u8; 8];
        for slot in stamp.iter_mut().rev() {
            *slot = PUSH_CHARS[(ts % 64) as usize];
            ts /= 64;
        }
        id.extend(stamp.iter().map(|&c| c as char));
        id.extend(last.random.iter().map(|&v| PUSH_CHARS[v as usize] as char));
        id
    }
}

fn fresh_random() -> [u8; RANDOM_LEN] {
    let bytes = uuid::Uuid::new_v4().into_bytes();
    let mut random = [0u8; RANDOM_LEN];
    for (slot, byte) in random.iter_mut().zip(bytes.iter()) {
        *slot = byte % 64;
    }
    random
}

/// Base-64 increment with carry. Wraps to all zeros on overflow (2^72 ids per ms).
fn increment(random: &mut [u8; RANDOM_LEN]) {
    for digit in random.iter_mut().rev() {
        if *digit == 63 {
            *digit = 0;
        } else {
            *digit += 1;
            return;
        }
    }
}
