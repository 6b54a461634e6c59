pub mod act;
pub mod anomalies;
pub mod health;
