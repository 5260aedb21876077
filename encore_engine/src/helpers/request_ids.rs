use chrono::Utc;

use crate::db_types::RequestId;

/// Generates a unique request id at admission time, e.g. `req_1718000000123_9f2ab01c`.
pub fn new_request_id() -> RequestId {
    let millis = Utc::now().timestamp_millis();
    let suffix = format!("{:08x}", rand::random::<u32>());
    RequestId(format!("req_{millis}_{suffix}"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ids_are_unique_and_well_formed() {
        let a = new_request_id();
        let b = new_request_id();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("req_"));
        assert_eq!(a.as_str().split('_').count(), 3);
    }
}
