use crate::db::HerdDb;
use herd_core::FieldInput;

pub async fn setup_test_db() -> HerdDb {
    HerdDb::new("sqlite::memory:").await.unwrap()
}

pub fn pasture(name: &str) -> FieldInput {
    FieldInput {
        name: name.to_string(),
        hectares: 80.0,
        photo: None,
        has_agriculture: false,
        has_livestock: true,
        latitude: Some(-34.6),
        longitude: Some(-58.4),
    }
}
