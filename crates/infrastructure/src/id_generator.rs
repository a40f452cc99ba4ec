use chrono::Utc;
use domain::{AllocationError, MAX_ID_LEN, SheetId, SheetIdGenerator};
use rand::Rng;
use rand::distributions::Alphanumeric;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 6;

/// Short sheet ids: prefix, base36 epoch milliseconds, random base62 tail.
///
/// `LS` + 8 time chars + 6 random chars = 16, which leaves room under the
/// column width until the timestamp grows a ninth digit in 2059.
#[derive(Debug, Clone)]
pub struct TimestampSheetIdGenerator {
    prefix: String,
}

impl TimestampSheetIdGenerator {
    pub fn new(prefix: &str) -> Result<Self, AllocationError> {
        // Longest time part this century plus the tail must still fit.
        if prefix.len() + 9 + SUFFIX_LEN > MAX_ID_LEN {
            return Err(AllocationError::InvalidId(format!(
                "Sheet id prefix {prefix} too long"
            )));
        }
        Ok(Self {
            prefix: prefix.to_string(),
        })
    }
}

impl Default for TimestampSheetIdGenerator {
    fn default() -> Self {
        Self {
            prefix: "LS".to_string(),
        }
    }
}

fn base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

impl SheetIdGenerator for TimestampSheetIdGenerator {
    fn next_id(&self) -> Result<SheetId, AllocationError> {
        let millis = Utc::now().timestamp_millis().max(0) as u64;
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SUFFIX_LEN)
            .map(char::from)
            .collect();
        SheetId::new(format!("{}{}{}", self.prefix, base36(millis), suffix))
    }
}
