//! Device applications: the per-device logic plugged into the dispatcher.
//!
//! Each application implements [`EventHandler`](crate::dispatcher::EventHandler)
//! and reaches hardware and the protocol stack only through the traits in
//! [`ports`], keeping this layer testable without real peripherals.
//!
//! | App              | Actuator / data source          | Published attributes            |
//! |------------------|---------------------------------|---------------------------------|
//! | `pump`           | `ActionStateMachine` + driver   | `OnOff`                         |
//! | `room_sensor`    | `PeriodicSampler` + `SensorBus` | temperature, humidity, lux, hPa |
//! | `leak_detector`  | `LeakAlarm`                     | `BooleanState`, `AlarmsActive`  |
//! | `flow_sensor`    | buttons                         | `FlowMeasuredValue`             |

pub mod base;
pub mod flow_sensor;
pub mod leak_detector;
pub mod ports;
pub mod pump;
pub mod room_sensor;
