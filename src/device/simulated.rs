use async_trait::async_trait;
use chrono::NaiveDate;

use super::{DeviceConfig, DeviceError, PunchSource};
use crate::attendance::punch::DevicePunch;

/// Fixed demo punches for two employees, dated on the requested day so a
/// demo sync shows a populated table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedSource;

impl SimulatedSource {
    pub fn punches(date: NaiveDate) -> Vec<DevicePunch> {
        let day = date.format("%Y-%m-%d");
        vec![
            DevicePunch::new("1", &format!("{day} 09:01:00"), 0),
            DevicePunch::new("2", &format!("{day} 09:03:00"), 0),
            DevicePunch::new("1", &format!("{day} 17:35:00"), 1),
            DevicePunch::new("2", &format!("{day} 18:05:00"), 1),
        ]
    }
}

#[async_trait]
impl PunchSource for SimulatedSource {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn fetch_punches(
        &self,
        _device: &DeviceConfig,
        date: NaiveDate,
    ) -> Result<Vec<DevicePunch>, DeviceError> {
        Ok(Self::punches(date))
    }

    async fn test_connection(&self, _device: &DeviceConfig) -> Result<String, DeviceError> {
        Ok("Simulated device, no connection needed".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::punch::Direction;

    #[test]
    fn test_simulated_punches_land_on_requested_day() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        let punches = SimulatedSource::punches(date);

        assert_eq!(punches.len(), 4);
        for punch in &punches {
            let event = punch.parse().unwrap();
            assert_eq!(event.timestamp.date(), date);
        }
        assert_eq!(punches[0].parse().unwrap().direction, Direction::CheckIn);
        assert_eq!(punches[3].parse().unwrap().direction, Direction::CheckOut);
    }
}
