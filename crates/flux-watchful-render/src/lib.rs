pub mod error;
pub mod layout;
pub mod template;

pub use error::{RenderError, Result};
pub use layout::{dashboard_body, layout, PlacedWidget};
pub use template::{alarm_properties, logical_id, CloudFormationTemplate, ALARM_TYPE, DASHBOARD_TYPE};
