//! Vehicle data API port

use async_trait::async_trait;
use polestar_domain::{Result, Tree};

/// Read-only queries against the vehicle data API
///
/// Both operations are idempotent and require a valid bearer token.
#[async_trait]
pub trait VehicleDataSource: Send + Sync {
    /// Static attributes of the vehicle with `vin`
    ///
    /// Fails with `NotFound` when the account has no vehicle with that VIN.
    async fn fetch_vehicle(&self, access_token: &str, vin: &str) -> Result<Tree>;

    /// Battery and odometer telemetry, `{battery: {...}, odometer: {...}}`
    async fn fetch_telemetry(&self, access_token: &str, vin: &str) -> Result<Tree>;
}
