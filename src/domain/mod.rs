// Domain layer: snippet model and ports (storage sink, validator oracle).

pub mod model;
pub mod ports;
