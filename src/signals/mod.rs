//! Signal Module
//!
//! Deterministic market signals computed from a bar series. All columns are
//! index-aligned with the bars; `NaN` marks warm-up positions.

pub mod leverage;
pub mod microstructure;
pub mod rolling;
pub mod volatility;

pub use leverage::{LeverageCalculator, LeverageSignals};
pub use microstructure::{MicrostructureCalculator, MicrostructureSignals};
pub use volatility::{VolatilityCalculator, VolatilitySignals};

use crate::engine::params::EngineParams;
use crate::market::bar::{closes, volumes, Bar};

/// Every signal family for one bar series
#[derive(Debug, Clone)]
pub struct SignalSet {
    pub returns: Vec<f64>,
    pub volatility: VolatilitySignals,
    pub leverage: LeverageSignals,
    pub microstructure: MicrostructureSignals,
}

impl SignalSet {
    pub fn compute(bars: &[Bar], params: &EngineParams) -> Self {
        let prices = closes(bars);
        let volume = volumes(bars);
        let returns = rolling::log_returns(&prices);

        let volatility = VolatilityCalculator::new(&params.volatility, params.annualization_factor)
            .compute_all(&returns);
        let leverage = LeverageCalculator::new(&params.leverage, params.annualization_factor)
            .compute_all(&prices, &returns);
        let microstructure = MicrostructureCalculator::new(&params.microstructure)
            .compute_all(&returns, &volume);

        Self {
            returns,
            volatility,
            leverage,
            microstructure,
        }
    }
}
