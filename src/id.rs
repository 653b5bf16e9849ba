use uuid::Uuid;

/// Time-ordered identifier for records created by this crate.
pub fn new_uuid_v7() -> String {
    Uuid::now_v7().to_string()
}
