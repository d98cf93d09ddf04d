use std::time::Duration;

/// Address of the public Breadboard deployment.
pub(crate) const DEFAULT_API_URL: &str = "http://breadboard-215702.appspot.com";

/// Every request is abandoned after this long.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Approximate latency of fetching a single run, in seconds.
pub(crate) const SECONDS_PER_REQUEST: f64 = 0.13;

/// Upper bound (seconds) on the total latency of fetching runs one by one.
pub(crate) const MAX_BRUTEFORCE_SECONDS: f64 = 1.0;

/// Runtime given to a row whose run record has no runtime.
pub(crate) const EPOCH_RUNTIME: &str = "1970-01-01T00:00:00Z";

/// Reserved keys of a run's `parameters`.
pub mod keys {
    pub const LIST_BOUND_VARIABLES: &str = "ListBoundVariables";
    pub const ANALYZED_VARIABLES: &str = "analyzed_variables";
    pub const INSTRUMENT_NAMES: &str = "instrument_names";
    pub const IMAGE_FILENAMES: &str = "image_filenames";
    pub const BADSHOT: &str = "badshot";
    pub const MEASUREMENT_NAME: &str = "measurement_name";
    pub const MANUAL_PREFIX: &str = "manual_";
    pub const RUNTIME: &str = "runtime";
    pub const UNIXTIME: &str = "unixtime";
}
