//! crescent-core — shared building blocks for the Crescent forecasting
//! pipeline.
//!
//! Everything here is synchronous and side-effect free apart from the
//! loader's file helpers and config parsing.
//!
//! # Architecture
//!
//! ```text
//! EventCalendar          (year → event period, day index)
//!   └── FeatureDeriver   (TimeSeries → EnrichedSeries)
//!         ├── calendar / surge-window flags
//!         ├── lags (+1h, +24h, +7d)
//!         └── rolling stats (1h mean/std/max/min, 24h mean)
//!
//! loader                 (resample, forward-fill, quality gate, JSON input)
//! CrescentConfig         (crescent.toml)
//! ```

pub mod calendar;
pub mod config;
pub mod error;
pub mod features;
pub mod loader;
pub mod series;
pub mod stats;

pub use calendar::{EventCalendar, EventPeriod, SurgeWindow};
pub use config::CrescentConfig;
pub use error::{CoreError, CoreResult};
pub use features::{FeatureDeriver, FeatureOptions};
pub use series::{EnrichedRow, EnrichedSeries, Sample, Tabular, TimeSeries};
