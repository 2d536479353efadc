use std::{
    any::Any,
    time::{Instant, SystemTime},
};

/// Text carried by a panic payload, if it is a string.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}

pub(crate) trait WallClockToInstant {
    /// Monotonic instant matching this wall-clock time as of now. Times in the
    /// past map to now or earlier. `None` if the result is not representable.
    fn to_instant(&self) -> Option<Instant>;
}

impl WallClockToInstant for SystemTime {
    fn to_instant(&self) -> Option<Instant> {
        let now = Instant::now();
        match self.duration_since(SystemTime::now()) {
            Ok(ahead) => now.checked_add(ahead),
            Err(behind) => Some(now.checked_sub(behind.duration()).unwrap_or(now)),
        }
    }
}
