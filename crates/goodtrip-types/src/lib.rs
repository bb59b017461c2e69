//! Wire types shared by the GoodTrip client and the mock backend.

pub mod api;
pub mod models;

#[cfg(test)]
mod tests {
    use super::api::AddTripRequest;
    use super::models::{CountryVisit, TripState};

    #[test]
    fn trip_state_uses_upper_case_names() {
        let json = serde_json::to_string(&TripState::Planned).unwrap();
        assert_eq!(json, "\"PLANNED\"");
    }

    #[test]
    fn client_side_visit_serializes_without_id() {
        let visit = CountryVisit::new("Portugal", ["Lisbon", "Porto"]);
        let value = serde_json::to_value(&visit).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["cities"][1]["name"], "Porto");
    }

    #[test]
    fn add_trip_request_is_camel_case() {
        let req: AddTripRequest = serde_json::from_value(serde_json::json!({
            "name": "Alps",
            "moneyInUsd": 1200,
            "startTripDate": "2024-07-01",
            "endTripDate": "2024-07-10",
            "state": "PLANNED"
        }))
        .unwrap();
        assert_eq!(req.money_in_usd, 1200);
        assert!(req.countries.is_empty());
        assert!(req.main_photo_url.is_none());
    }
}
