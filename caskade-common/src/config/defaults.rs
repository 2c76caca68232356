use std::time::Duration;

use crate::Secret;

pub(crate) const fn _default_false() -> bool {
    false
}

#[inline]
pub(crate) fn _default_database_url() -> Secret<String> {
    Secret::new("sqlite:data/db".to_owned())
}

#[inline]
pub(crate) fn _default_tgt_lifetime() -> Duration {
    Duration::from_secs(60 * 60 * 24)
}

#[inline]
pub(crate) fn _default_tgt_lifetime_long_term() -> Duration {
    Duration::from_secs(60 * 60 * 24 * 10)
}

#[inline]
pub(crate) fn _default_st_lifetime_unconsumed() -> Duration {
    Duration::from_secs(60 * 5)
}

#[inline]
pub(crate) fn _default_st_lifetime_consumed() -> Duration {
    Duration::from_secs(60 * 60 * 24)
}

pub(crate) const fn _default_max_failed_login_attempts() -> i32 {
    5
}

#[inline]
pub(crate) fn _default_lock_timeout() -> Duration {
    Duration::from_secs(60 * 30)
}

#[inline]
pub(crate) fn _default_retention() -> Duration {
    Duration::from_secs(60 * 60 * 24 * 7)
}
