//! Domain types shared by the gateway, the saga and the runtime.

mod types;

pub use types::{
    Destination, Destinations, Incident, IncidentPriority, IncidentStatus, Mission, MissionStatus,
    Responder, Responders,
};
