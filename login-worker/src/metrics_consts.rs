pub const RECORDS_FETCHED: &str = "login_records_fetched_total";
pub const QUEUE_EMPTY: &str = "login_queue_empty_total";
pub const FETCH_FAILED: &str = "login_fetch_failed_total";
pub const RECORDS_REJECTED: &str = "login_records_rejected_total";
pub const TRANSFORM_FAILED: &str = "login_transform_failed_total";
pub const RECORDS_LOADED: &str = "login_records_loaded_total";
pub const LOAD_FAILED: &str = "login_load_failed_total";
pub const LOAD_DURATION: &str = "login_load_duration_seconds";
