// Domain layer: records flowing through both pipelines and the ports they are built on.

pub mod model;
pub mod ports;
