use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trip parameters sent to every provider quote endpoint.
///
/// Serializes to the camelCase JSON body the provider APIs expect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDetails {
    /// Destination country or region code
    pub destination: String,

    /// Traveler's country of residence
    pub origin: String,

    /// First day of the trip
    pub departure_date: NaiveDate,

    /// Last day of the trip
    pub return_date: NaiveDate,

    /// Number of travelers to cover
    pub travelers: u32,

    /// Total insurable trip cost
    pub trip_cost: Decimal,
}

impl TripDetails {
    /// Stable fingerprint of this trip, used as the per-trip cache key.
    ///
    /// Derived from the canonical JSON encoding, so two requests with
    /// identical parameters share cache entries.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        format!("{:x}", md5::compute(json.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_trip() -> TripDetails {
        TripDetails {
            destination: "JP".to_string(),
            origin: "US".to_string(),
            departure_date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            return_date: NaiveDate::from_ymd_opt(2026, 9, 15).unwrap(),
            travelers: 2,
            trip_cost: dec!(4800),
        }
    }

    #[test]
    fn test_fingerprint_is_stable() {
        assert_eq!(sample_trip().fingerprint(), sample_trip().fingerprint());
    }

    #[test]
    fn test_fingerprint_changes_with_parameters() {
        let base = sample_trip();
        let mut other = sample_trip();
        other.travelers = 3;
        assert_ne!(base.fingerprint(), other.fingerprint());
    }

    #[test]
    fn test_serializes_to_camel_case_wire_body() {
        let json = serde_json::to_value(sample_trip()).unwrap();
        assert_eq!(json["destination"], "JP");
        assert_eq!(json["departureDate"], "2026-09-01");
        assert_eq!(json["returnDate"], "2026-09-15");
        assert_eq!(json["travelers"], 2);
        assert!(json["tripCost"].is_number());
    }
}
