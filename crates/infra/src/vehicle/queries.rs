//! GraphQL documents sent to the vehicle data API
//!
//! Treated as opaque contracts: the bridge forwards whatever the API returns
//! for these selections.

use serde::Serialize;
use serde_json::{json, Value};

pub const CONSUMER_CARS_OPERATION: &str = "GetConsumerCarsV2";
pub const CONSUMER_CARS_FIELD: &str = "getConsumerCarsV2";

pub const CONSUMER_CARS_QUERY: &str = "query GetConsumerCarsV2 {
  getConsumerCarsV2 {
    vin
    internalVehicleIdentifier
    modelYear
    content { model { code name } images { studio { url angles } } }
    hasPerformancePackage
    registrationNo
    deliveryDate
    currentPlannedDeliveryDate
    factoryCompleteDate
    registrationDate
    software { version versionTimestamp }
  }
}";

pub const TELEMATICS_OPERATION: &str = "CarTelematics";
pub const TELEMATICS_FIELD: &str = "carTelematics";

pub const TELEMATICS_QUERY: &str = "query CarTelematics($vin: String!) {
  carTelematics(vin: $vin) {
    battery {
      averageEnergyConsumptionKwhPer100Km
      batteryChargeLevelPercentage
      chargerConnectionStatus
      chargingCurrentAmps
      chargingPowerWatts
      chargingStatus
      estimatedChargingTimeMinutesToTargetDistance
      estimatedChargingTimeToFullMinutes
      estimatedDistanceToEmptyKm
      estimatedDistanceToEmptyMiles
      eventUpdatedTimestamp { iso unix }
    }
    odometer {
      averageSpeedKmPerHour
      odometerMeters
      tripMeterAutomaticKm
      tripMeterManualKm
      eventUpdatedTimestamp { iso unix }
    }
  }
}";

/// Request body `{query, operationName, variables}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest {
    pub query: &'static str,
    pub operation_name: &'static str,
    pub variables: Value,
}

impl GraphQlRequest {
    pub fn consumer_cars() -> Self {
        Self {
            query: CONSUMER_CARS_QUERY,
            operation_name: CONSUMER_CARS_OPERATION,
            variables: json!({}),
        }
    }

    pub fn telematics(vin: &str) -> Self {
        Self {
            query: TELEMATICS_QUERY,
            operation_name: TELEMATICS_OPERATION,
            variables: json!({ "vin": vin }),
        }
    }
}
