//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter           | Implements          | Connects to                  |
//! |-------------------|---------------------|------------------------------|
//! | `attribute_store` | AttributeStore      | In-memory attribute table    |
//! | `stack`           | WorkScheduler (via) | Host stack run-loop thread   |
//! | `commissioning`   | CommissioningPort   | Simulated commissioning      |
//! | `sim_sensors`     | SensorBus           | Simulated room-sensor board  |
//! | `time`            | -                   | Monotonic system timer       |

pub mod attribute_store;
pub mod commissioning;
pub mod sim_sensors;
pub mod stack;
pub mod time;
