use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_aux::field_attributes::deserialize_default_from_null;

use crate::resolution::Resolution;

/// The `{"result": ...}` wrapper every endpoint answers with.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub result: Option<T>,
}

/// Per-item status the platform attaches to results of multi-id requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, deserialize_with = "deserialize_default_from_null")]
    pub error_code: i32,
    #[serde(default, deserialize_with = "deserialize_default_from_null")]
    pub error_text: String,
    #[serde(default, deserialize_with = "deserialize_default_from_null")]
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_default_from_null")]
    pub stack_trace: String,
}

/// One result item together with its status.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResultItem<T> {
    pub result: Option<T>,
    #[serde(flatten)]
    pub status: StatusResponse,
}

#[derive(Debug, Serialize)]
pub struct MeteringPointsRequest {
    #[serde(rename = "meteringPoints")]
    pub metering_points: MeteringPointIds,
}

#[derive(Debug, Serialize)]
pub struct MeteringPointIds {
    #[serde(rename = "meteringPoint")]
    pub metering_point: Vec<String>,
}

impl MeteringPointsRequest {
    pub fn new(ids: &[String]) -> Self {
        MeteringPointsRequest {
            metering_points: MeteringPointIds {
                metering_point: ids.to_vec(),
            },
        }
    }
}

// Time series

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    #[serde(rename = "MyEnergyData_MarketDocument")]
    pub market_document: MarketDocument,
    #[serde(flatten)]
    pub status: StatusResponse,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketDocument {
    #[serde(rename = "mRID", default)]
    pub mrid: String,
    #[serde(rename = "createdDateTime", default, deserialize_with = "deserialize_flexible_time")]
    pub created_date_time: Option<DateTime<Utc>>,
    #[serde(rename = "sender_MarketParticipant.name", default, deserialize_with = "deserialize_default_from_null")]
    pub sender_name: String,
    #[serde(rename = "sender_MarketParticipant.mRID", default)]
    pub sender_mrid: Option<Mrid>,
    #[serde(rename = "period.timeInterval", default)]
    pub period_time_interval: Option<TimeInterval>,
    #[serde(rename = "TimeSeries", default)]
    pub time_series: Vec<TimeSeriesEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mrid {
    #[serde(rename = "codingScheme", default, deserialize_with = "deserialize_default_from_null")]
    pub coding_scheme: String,
    #[serde(default, deserialize_with = "deserialize_default_from_null")]
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// One metering point's data stream inside a time series document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeSeriesEntry {
    #[serde(rename = "mRID", default)]
    pub mrid: String,
    #[serde(rename = "businessType", default, deserialize_with = "deserialize_default_from_null")]
    pub business_type: String,
    #[serde(rename = "curveType", default, deserialize_with = "deserialize_default_from_null")]
    pub curve_type: String,
    #[serde(rename = "measurement_Unit.name", default, deserialize_with = "deserialize_default_from_null")]
    pub measurement_unit_name: String,
    #[serde(rename = "MarketEvaluationPoint", default)]
    pub market_evaluation_point: Option<MarketEvaluationPoint>,
    #[serde(rename = "Period", default)]
    pub periods: Vec<Period>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketEvaluationPoint {
    #[serde(rename = "mRID", default)]
    pub mrid: Mrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Period {
    pub resolution: Resolution,
    #[serde(rename = "timeInterval")]
    pub time_interval: TimeInterval,
    #[serde(rename = "point", alias = "Point", default)]
    pub points: Vec<Point>,
}

/// A sample addressed by its 1-based position inside the period. Both
/// numbers arrive as strings and are parsed when flattening.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Point {
    pub position: String,
    #[serde(rename = "out_Quantity.quantity")]
    pub quantity: String,
    #[serde(rename = "out_Quantity.quality", default, deserialize_with = "deserialize_default_from_null")]
    pub quality: String,
}

// Metering points

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeteringPoint {
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub metering_point_id: String,
    #[serde(rename = "typeOfMP", deserialize_with = "deserialize_default_from_null")]
    pub type_of_mp: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub balance_supplier_name: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub street_code: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub street_name: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub building_number: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub floor_id: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub room_id: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub postcode: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub city_name: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub municipality_code: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub settlement_method: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub meter_reading_occurrence: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub first_consumer_party_name: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub meter_number: String,
    #[serde(deserialize_with = "deserialize_flexible_time")]
    pub consumer_start_date: Option<DateTime<Utc>>,
    pub has_relation: bool,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub child_metering_points: Vec<ChildMeteringPoint>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChildMeteringPoint {
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub metering_point_id: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub parent_metering_point_id: String,
    #[serde(rename = "typeOfMP", deserialize_with = "deserialize_default_from_null")]
    pub type_of_mp: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub meter_reading_occurrence: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub meter_number: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeteringPointDetail {
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub metering_point_id: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub parent_metering_point_id: String,
    #[serde(rename = "typeOfMP", deserialize_with = "deserialize_default_from_null")]
    pub type_of_mp: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub energy_time_series_measure_unit: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub estimated_annual_volume: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub settlement_method: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub meter_number: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub grid_operator_name: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub metering_grid_area_identification: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub net_settlement_group: String,
    #[serde(rename = "physicalStatusOfMP", deserialize_with = "deserialize_default_from_null")]
    pub physical_status_of_mp: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub consumer_category: String,
    #[serde(rename = "powerLimitKW", deserialize_with = "deserialize_default_from_null")]
    pub power_limit_kw: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub product: String,
    #[serde(rename = "consumerCVR", deserialize_with = "deserialize_default_from_null")]
    pub consumer_cvr: String,
    #[serde(deserialize_with = "deserialize_flexible_time")]
    pub consumer_start_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub balance_supplier_name: String,
    #[serde(deserialize_with = "deserialize_flexible_time")]
    pub balance_supplier_start_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub street_name: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub building_number: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub postcode: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub city_name: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub child_metering_points: Vec<ChildMeteringPoint>,
}

// Charges

/// Charges of one metering point. Third party results carry no fees.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Charges {
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub metering_point_id: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub subscriptions: Vec<Charge>,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub fees: Vec<Charge>,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub tariffs: Vec<TariffCharge>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Charge {
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub name: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub description: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub owner: String,
    #[serde(deserialize_with = "deserialize_flexible_time")]
    pub valid_from_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "deserialize_flexible_time")]
    pub valid_to_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub period_type: String,
    pub price: f64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TariffCharge {
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub name: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub description: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub owner: String,
    #[serde(deserialize_with = "deserialize_flexible_time")]
    pub valid_from_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "deserialize_flexible_time")]
    pub valid_to_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub period_type: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub prices: Vec<TariffPrice>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TariffPrice {
    pub position: String,
    pub price: f64,
}

// Authorizations (third party only)

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Authorization {
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub id: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub third_party_name: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub valid_from: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub valid_to: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub customer_name: String,
    #[serde(rename = "customerCVR", deserialize_with = "deserialize_default_from_null")]
    pub customer_cvr: String,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub customer_key: String,
    pub include_future_metering_points: bool,
    #[serde(deserialize_with = "deserialize_flexible_time")]
    pub time_stamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorizationScope {
    #[serde(rename = "authorizationId")]
    AuthorizationId,
    #[serde(rename = "customerCVR")]
    CustomerCvr,
    #[serde(rename = "customerKey")]
    CustomerKey,
}

impl AuthorizationScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationScope::AuthorizationId => "authorizationId",
            AuthorizationScope::CustomerCvr => "customerCVR",
            AuthorizationScope::CustomerKey => "customerKey",
        }
    }
}

impl std::str::FromStr for AuthorizationScope {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "authorizationid" => Ok(AuthorizationScope::AuthorizationId),
            "customercvr" => Ok(AuthorizationScope::CustomerCvr),
            "customerkey" => Ok(AuthorizationScope::CustomerKey),
            _ => Err(crate::Error::Config(format!("unknown authorization scope '{}'", s))),
        }
    }
}

/// Accepts RFC 3339 timestamps, empty strings and nulls.
fn deserialize_flexible_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => DateTime::parse_from_rfc3339(text)
            .map(|time| Some(time.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_time_series_document() {
        let data_str = r#"
        {
            "MyEnergyData_MarketDocument": {
                "mRID": "2b43a48a-ae74-4059-a72c-325515b6279a",
                "createdDateTime": "2024-01-02T10:00:00Z",
                "sender_MarketParticipant.name": "",
                "sender_MarketParticipant.mRID": { "codingScheme": null, "name": null },
                "period.timeInterval": {
                    "start": "2023-12-31T23:00:00Z",
                    "end": "2024-01-01T23:00:00Z"
                },
                "TimeSeries": [
                    {
                        "mRID": "571313180100000001",
                        "businessType": "A04",
                        "curveType": "A01",
                        "measurement_Unit.name": "KWH",
                        "MarketEvaluationPoint": {
                            "mRID": { "codingScheme": "A10", "name": "571313180100000001" }
                        },
                        "Period": [
                            {
                                "resolution": "PT1H",
                                "timeInterval": {
                                    "start": "2023-12-31T23:00:00Z",
                                    "end": "2024-01-01T01:00:00Z"
                                },
                                "point": [
                                    { "position": "1", "out_Quantity.quantity": "0.123", "out_Quantity.quality": "A04" },
                                    { "position": "2", "out_Quantity.quantity": "0.456", "out_Quantity.quality": "A04" }
                                ]
                            }
                        ]
                    }
                ]
            },
            "success": true,
            "errorCode": 10000,
            "errorText": "NoError",
            "id": "571313180100000001",
            "stackTrace": null
        }"#;

        let data: TimeSeries = serde_json::from_str(data_str).unwrap();
        let entry = &data.market_document.time_series[0];
        assert_eq!(entry.mrid, "571313180100000001");
        assert_eq!(entry.measurement_unit_name, "KWH");
        assert_eq!(entry.periods[0].resolution, Resolution::Hour);
        assert_eq!(entry.periods[0].points.len(), 2);
        assert_eq!(entry.periods[0].points[1].quantity, "0.456");
        assert_eq!(
            entry.periods[0].time_interval.start,
            Utc.with_ymd_and_hms(2023, 12, 31, 23, 0, 0).unwrap()
        );
        assert!(data.status.success);
        assert_eq!(data.status.error_code, 10000);
        assert_eq!(data.status.stack_trace, "");
        assert_eq!(data.market_document.sender_mrid.unwrap().name, "");
    }

    #[test]
    fn test_capitalized_point_key() {
        let data_str = r#"
        {
            "resolution": "PT1H",
            "timeInterval": { "start": "2024-01-01T00:00:00Z", "end": "2024-01-01T01:00:00Z" },
            "Point": [ { "position": "1", "out_Quantity.quantity": "0.123", "out_Quantity.quality": "A04" } ]
        }"#;

        let period: Period = serde_json::from_str(data_str).unwrap();
        assert_eq!(period.points.len(), 1);
        assert_eq!(period.points[0].position, "1");
    }

    #[test]
    fn test_flexible_time_fields() {
        let data_str = r#"
        {
            "meteringPointId": "571313180100000001",
            "typeOfMP": "E17",
            "balanceSupplierName": null,
            "consumerStartDate": "",
            "hasRelation": true,
            "childMeteringPoints": null
        }"#;

        let point: MeteringPoint = serde_json::from_str(data_str).unwrap();
        assert_eq!(point.type_of_mp, "E17");
        assert_eq!(point.balance_supplier_name, "");
        assert_eq!(point.consumer_start_date, None);
        assert!(point.child_metering_points.is_empty());

        let point: MeteringPoint =
            serde_json::from_str(r#"{ "consumerStartDate": "2020-05-01T00:00:00+02:00" }"#).unwrap();
        assert_eq!(
            point.consumer_start_date,
            Some(Utc.with_ymd_and_hms(2020, 4, 30, 22, 0, 0).unwrap())
        );

        assert!(serde_json::from_str::<MeteringPoint>(r#"{ "consumerStartDate": "yesterday" }"#).is_err());
    }

    #[test]
    fn test_charges_result_items() {
        let data_str = r#"
        [
            {
                "result": {
                    "meteringPointId": "571313180100000001",
                    "subscriptions": [ { "name": "Abonnement", "price": 23.2, "quantity": 1, "validFromDate": "2024-01-01T00:00:00Z", "validToDate": null } ],
                    "tariffs": [ { "name": "Nettarif", "prices": [ { "position": "1", "price": 0.1 } ] } ]
                },
                "success": true,
                "errorCode": 10000,
                "errorText": "NoError",
                "id": "571313180100000001",
                "stackTrace": null
            }
        ]"#;

        let items: Vec<ResultItem<Charges>> = serde_json::from_str(data_str).unwrap();
        let charges = items[0].result.as_ref().unwrap();
        assert!(items[0].status.success);
        assert_eq!(charges.subscriptions[0].quantity, 1);
        assert_eq!(charges.subscriptions[0].valid_to_date, None);
        assert!(charges.fees.is_empty());
        assert_eq!(charges.tariffs[0].prices[0].position, "1");
    }

    #[test]
    fn test_metering_points_request_body() {
        let body = MeteringPointsRequest::new(&["571313180100000001".to_string()]);
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"meteringPoints":{"meteringPoint":["571313180100000001"]}}"#
        );
    }
}
