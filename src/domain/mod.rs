// Domain layer: wire values and ports. No HTTP or XML parsing in here.

pub mod model;
pub mod ports;
