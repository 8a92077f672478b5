use async_trait::async_trait;
use polestar_core::VehicleDataSource;
use polestar_domain::{ApiConfig, BridgeError, Result, Tree};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::queries::{GraphQlRequest, CONSUMER_CARS_FIELD, TELEMATICS_FIELD};
use crate::http::HttpTransport;

/// Bearer-authenticated client for the vehicle GraphQL endpoint
#[derive(Clone)]
pub struct VehicleApiClient {
    http: HttpTransport,
    url: String,
}

impl VehicleApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = HttpTransport::builder().timeout(config.timeout).build()?;
        Ok(Self::with_transport(http, config.url.clone()))
    }

    pub fn with_transport(http: HttpTransport, url: impl Into<String>) -> Self {
        Self { http, url: url.into() }
    }

    /// POST one query and return its `data.<field>` member
    async fn query(
        &self,
        access_token: &str,
        request: &GraphQlRequest,
        field: &str,
    ) -> Result<Value> {
        let response = self.http.post_json(&self.url, access_token, request).await?;
        if !response.is_success() {
            return Err(BridgeError::upstream(response.status(), response.body()));
        }

        let mut body: Value =
            response.json().map_err(|_| BridgeError::upstream(response.status(), response.body()))?;
        if let Some(errors) = body.get("errors") {
            warn!(operation = request.operation_name, errors = %errors, "API reported errors");
        }

        match body.get_mut("data").and_then(|data| data.get_mut(field)).map(Value::take) {
            Some(value) if !value.is_null() => Ok(value),
            _ => Err(BridgeError::upstream(response.status(), response.body())),
        }
    }
}

#[async_trait]
impl VehicleDataSource for VehicleApiClient {
    #[instrument(skip(self, access_token))]
    async fn fetch_vehicle(&self, access_token: &str, vin: &str) -> Result<Tree> {
        let request = GraphQlRequest::consumer_cars();
        let cars = match self.query(access_token, &request, CONSUMER_CARS_FIELD).await? {
            Value::Array(cars) => cars,
            other => {
                let detail = format!("{CONSUMER_CARS_FIELD} is not a list: {other}");
                return Err(BridgeError::upstream(200, &detail));
            }
        };

        debug!(vehicles = cars.len(), "Vehicles visible to account");
        cars.into_iter()
            .find(|car| {
                car.get("vin")
                    .and_then(Value::as_str)
                    .is_some_and(|candidate| candidate.eq_ignore_ascii_case(vin))
            })
            .ok_or_else(|| {
                BridgeError::NotFound(format!("no vehicle with VIN {vin} on this account"))
            })
    }

    #[instrument(skip(self, access_token))]
    async fn fetch_telemetry(&self, access_token: &str, vin: &str) -> Result<Tree> {
        self.query(access_token, &GraphQlRequest::telematics(vin), TELEMATICS_FIELD).await
    }
}
