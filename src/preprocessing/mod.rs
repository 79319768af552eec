//! Feature scaling shared by the clustering and churn stages

mod scaler;

pub use scaler::{ScalerParams, StandardScaler};
