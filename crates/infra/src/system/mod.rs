use chrono::Utc;

// Mocking out time so that it is possible to run tests that depend on time.
pub trait ISys: Send + Sync {
    /// The current unix timestamp in seconds
    fn get_timestamp(&self) -> i64;
}

/// System that gets the real time and is used when not testing
pub struct RealSys {}
impl ISys for RealSys {
    fn get_timestamp(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// A clock frozen at a given timestamp
pub struct StaticTimeSys(pub i64);
impl ISys for StaticTimeSys {
    fn get_timestamp(&self) -> i64 {
        self.0
    }
}
