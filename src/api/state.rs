use crate::forecast::CostForecaster;
use crate::storage::Pool;

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub forecaster: CostForecaster,
}

impl AppState {
    pub fn new(pool: Pool, forecaster: CostForecaster) -> Self {
        Self { pool, forecaster }
    }
}
