//! Adoption appointment scheduling tool
//!
//! Appointments are always booked a fixed number of days out from the moment
//! the tool is invoked.

use super::{Tool, ToolMetadata, ToolResult};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

pub const SCHEDULE_APPOINTMENT: &str = "scheduleDogAdoptionAppointment";

pub const APPOINTMENT_LEAD_DAYS: i64 = 3;

/// When an appointment requested at `now` takes place.
pub fn appointment_time(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(APPOINTMENT_LEAD_DAYS)
}

/// Schedules a pickup appointment at the agency
pub struct DogAdoptionSchedulerTool;

impl DogAdoptionSchedulerTool {
    pub fn new() -> Self {
        Self
    }

    /// Book the appointment and return the instant as a JSON string.
    pub fn schedule(&self, dog_id: i64, dog_name: &str) -> Result<String> {
        tracing::info!(dog_id, dog_name, "confirming appointment");
        let instant = appointment_time(Utc::now());
        Ok(serde_json::to_string(&instant)?)
    }
}

impl Default for DogAdoptionSchedulerTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for DogAdoptionSchedulerTool {
    fn metadata(&self) -> ToolMetadata {
        crate::tool_metadata! {
            name: SCHEDULE_APPOINTMENT,
            description: "schedule an appointment to adopt a dog at Pooch Palace dog adoption agency",
            parameters: [
                {
                    name: "dogId",
                    type: "integer",
                    description: "the id of the dog",
                    required: true
                },
                {
                    name: "dogName",
                    type: "string",
                    description: "the name of the dog",
                    required: true
                }
            ]
        }
    }

    fn validate(&self, args: &Value) -> Result<()> {
        crate::validate_required_number!(args, "dogId");
        crate::validate_required_string!(args, "dogName");
        Ok(())
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let dog_id = crate::validate_required_number!(args, "dogId");
        let dog_name = crate::validate_required_string!(args, "dogName");

        Ok(ToolResult::success(self.schedule(dog_id, dog_name)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_appointment_is_three_days_out() {
        let now = DateTime::parse_from_rfc3339("2025-03-01T10:15:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let expected = DateTime::parse_from_rfc3339("2025-03-04T10:15:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(appointment_time(now), expected);
    }

    #[tokio::test]
    async fn test_execute_returns_json_instant_three_days_after_invocation() {
        let tool = DogAdoptionSchedulerTool::new();

        let before = Utc::now();
        let result = tool
            .execute(json!({"dogId": 45, "dogName": "Prancer"}))
            .await
            .unwrap();
        let after = Utc::now();

        assert!(result.success);
        assert!(result.output.starts_with('"') && result.output.ends_with('"'));

        let instant: DateTime<Utc> = serde_json::from_str(&result.output).unwrap();
        assert!(instant >= before + Duration::days(3));
        assert!(instant <= after + Duration::days(3));
    }

    #[tokio::test]
    async fn test_execute_requires_both_arguments() {
        let tool = DogAdoptionSchedulerTool::new();

        assert!(tool.execute(json!({"dogName": "Prancer"})).await.is_err());
        assert!(tool.validate(&json!({"dogId": 45})).is_err());
        assert!(tool.validate(&json!({"dogId": 45, "dogName": "Prancer"})).is_ok());
    }
}
