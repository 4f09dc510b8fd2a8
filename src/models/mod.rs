// Domain models: fleet, readings, uptime history

mod device;
mod reading;
mod scan;
pub mod uptime;

pub use device::Device;
pub use reading::{Counter, CounterReading, CounterValue, RouteTable};
pub use scan::DeviceScan;
pub use uptime::{TIMESTAMP_FORMAT, TimelinePoint, UptimeSample};
