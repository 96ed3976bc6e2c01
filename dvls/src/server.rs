//! Instance information and time zones.

use std::sync::Arc;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    entry::null_as_default,
    error::DvlsResult,
    response::Response,
    time::{self, ServerTime},
    transport::AuthenticatedTransport,
};

/// Instance information endpoint available without login.
pub const PUBLIC_INFO_ENDPOINT: &str = "api/public-instance-information";
/// Instance information endpoint for logged in callers.
pub const PRIVATE_INFO_ENDPOINT: &str = "api/private-instance-information";
/// Time zone catalog endpoint.
pub const TIMEZONES_ENDPOINT: &str = "api/configuration/timezones";

/// Instance information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerInfo {
    /// Public address of the instance
    #[serde(rename = "AccessUri", alias = "accessUri", deserialize_with = "null_as_default")]
    pub access_uri: String,
    /// Configured time zone id
    #[serde(rename = "SelectedTimeZoneId", alias = "selectedTimeZoneId", deserialize_with = "null_as_default")]
    pub time_zone: String,
    /// Instance name
    #[serde(rename = "ServerName", alias = "serverName", alias = "servername", deserialize_with = "null_as_default")]
    pub server_name: String,
    /// Server version
    #[serde(rename = "Version", alias = "version", deserialize_with = "null_as_default")]
    pub version: String,
    /// Banner message
    #[serde(rename = "SystemMessage", alias = "systemMessage", deserialize_with = "null_as_default")]
    pub system_message: String,
}

/// A time zone of the server's catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Timezone {
    /// Zone id
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    /// Display name
    #[serde(deserialize_with = "null_as_default")]
    pub display_name: String,
    /// Standard time name
    #[serde(deserialize_with = "null_as_default")]
    pub standard_name: String,
    /// Daylight time name
    #[serde(deserialize_with = "null_as_default")]
    pub daylight_name: String,
    /// Offset from UTC, `hh:mm:ss`
    #[serde(deserialize_with = "null_as_default")]
    pub base_utc_offset: String,
    /// Daylight saving rules
    #[serde(deserialize_with = "null_as_default")]
    pub adjustment_rules: Vec<AdjustmentRule>,
    /// Whether the zone observes daylight saving time
    pub supports_daylight_saving_time: bool,
}

/// A period with its own daylight saving rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct AdjustmentRule {
    /// First day of the rule
    #[serde(deserialize_with = "time::deserialize_optional")]
    pub date_start: Option<ServerTime>,
    /// Last day of the rule
    #[serde(deserialize_with = "time::deserialize_optional")]
    pub date_end: Option<ServerTime>,
    /// Daylight offset, `hh:mm:ss`
    #[serde(deserialize_with = "null_as_default")]
    pub daylight_delta: String,
    /// Switch to daylight time
    pub daylight_transition_start: TransitionTime,
    /// Switch back to standard time
    pub daylight_transition_end: TransitionTime,
    /// Change of the base offset, `hh:mm:ss`
    #[serde(deserialize_with = "null_as_default")]
    pub base_utc_offset_delta: String,
    /// Whether the rule has no transitions
    pub no_daylight_transitions: bool,
}

/// When a daylight saving transition happens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct TransitionTime {
    /// Time of day, on a placeholder date
    #[serde(deserialize_with = "time::deserialize_optional")]
    pub time_of_day: Option<ServerTime>,
    /// Month, 1 to 12
    pub month: u8,
    /// Week of the month, 1 to 5
    pub week: u8,
    /// Day of the month, for fixed date rules
    pub day: u8,
    /// Day of the week, 0 is Sunday
    pub day_of_week: u8,
    /// Whether `day` is used instead of `week` and `day_of_week`
    pub is_fixed_date_rule: bool,
}

/// Instance metadata calls.
#[derive(Debug, Clone)]
pub struct ServerService {
    transport: Arc<AuthenticatedTransport>,
}

impl ServerService {
    pub(crate) const fn new(transport: Arc<AuthenticatedTransport>) -> Self {
        Self { transport }
    }

    async fn fetch(&self, path: &str) -> DvlsResult<Response> {
        let url = self.transport.url(path)?;
        let response = self.transport.send_empty(Method::GET, url).await?;
        response.check_save_result()?;
        Ok(response)
    }

    /// Information shown on the login page.
    ///
    /// # Errors
    ///
    /// Request and result code errors.
    #[instrument(skip(self))]
    pub async fn public_info(&self) -> DvlsResult<ServerInfo> {
        self.fetch(PUBLIC_INFO_ENDPOINT).await?.data()
    }

    /// Information for logged in callers.
    ///
    /// # Errors
    ///
    /// Request and result code errors.
    #[instrument(skip(self))]
    pub async fn private_info(&self) -> DvlsResult<ServerInfo> {
        self.fetch(PRIVATE_INFO_ENDPOINT).await?.data()
    }

    /// Time zone catalog.
    ///
    /// # Errors
    ///
    /// Request and result code errors.
    #[instrument(skip(self))]
    pub async fn timezones(&self) -> DvlsResult<Vec<Timezone>> {
        self.fetch(TIMEZONES_ENDPOINT).await?.data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_server_info_pascal_case() {
        let body = serde_json::to_vec(&json!({
            "result": 1,
            "data": {
                "AccessUri": "https://dvls.local",
                "SelectedTimeZoneId": "UTC",
                "ServerName": "dvls",
                "Version": "2024.3.1",
                "SystemMessage": null
            }
        }))
        .unwrap();
        let info: ServerInfo = Response::parse(body, false).unwrap().data().unwrap();
        assert_eq!(info.time_zone, "UTC");
        assert_eq!(info.version, "2024.3.1");
        assert!(info.system_message.is_empty());
    }

    #[test]
    fn test_timezone_with_rule() {
        let zone: Timezone = serde_json::from_value(json!({
            "Id": "Eastern Standard Time",
            "DisplayName": "(UTC-05:00) Eastern Time",
            "BaseUtcOffset": "-05:00:00",
            "SupportsDaylightSavingTime": true,
            "AdjustmentRules": [{
                "DateStart": "2007-01-01T00:00:00",
                "DateEnd": "9999-12-31T00:00:00",
                "DaylightDelta": "01:00:00",
                "DaylightTransitionStart": {
                    "TimeOfDay": "0001-01-01T02:00:00",
                    "Month": 3, "Week": 2, "Day": 1, "DayOfWeek": 0,
                    "IsFixedDateRule": false
                },
                "DaylightTransitionEnd": {"TimeOfDay": "0001-01-01T02:00:00", "Month": 11, "Week": 1},
                "BaseUtcOffsetDelta": "00:00:00",
                "NoDaylightTransitions": false
            }]
        }))
        .unwrap();
        assert_eq!(zone.adjustment_rules.len(), 1);
        let rule = &zone.adjustment_rules[0];
        assert_eq!(rule.daylight_transition_start.month, 3);
        assert_eq!(rule.daylight_transition_end.week, 1);
        assert!(rule.date_start.is_some());
        assert!(zone.standard_name.is_empty());
    }
}
