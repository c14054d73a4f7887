// Domain layer: ledger models, currency rules and ports (interfaces).

pub mod currency;
pub mod model;
pub mod ports;
